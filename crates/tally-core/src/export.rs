//! Plain-text export of a list, grouped by status.
//!
//! ```text
//! Listed
//! 2x Milk
//! 1x Eggs
//!
//! Ordered
//! 12x Nails
//! ```
//!
//! Groups follow workflow order and keep the list's custom order inside each
//! group. Statuses without items are left out. Items whose status is not in
//! the workflow are listed under the first status.

use tally_types::{Item, List, StatusGroup};

/// Render `list` for sharing.
pub fn export_text(list: &List, workflow: &StatusGroup) -> String {
    let mut sections: Vec<String> = Vec::new();

    for (index, status) in workflow.statuses.iter().enumerate() {
        let items: Vec<&Item> = list
            .items
            .iter()
            .filter(|item| {
                item.status == status.id || (index == 0 && !workflow.contains(item.status))
            })
            .collect();
        if items.is_empty() {
            continue;
        }

        let mut section = capitalize(&status.name);
        for item in items {
            section.push('\n');
            section.push_str(&format!("{}x {}", item.quantity, item.name));
        }
        sections.push(section);
    }

    sections.join("\n\n")
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_types::{OrderKey, OwnerId, StatusId, default_workflows};

    #[test]
    fn test_export_groups_in_workflow_order() {
        let wf = default_workflows().remove(1);
        let mut list = List::new(OwnerId::new(), "Hardware", OrderKey::new(0.0), wf.id);
        list.items = vec![
            Item::new("Nails", 12, wf.statuses[1].id),
            Item::new("Milk", 2, wf.statuses[0].id),
            Item::new("Eggs", 1, wf.statuses[0].id),
        ];
        assert_eq!(export_text(&list, &wf), "Listed\n2x Milk\n1x Eggs\n\nOrdered\n12x Nails");
    }

    #[test]
    fn test_export_capitalizes_and_skips_empty() {
        let mut wf = default_workflows().remove(0);
        wf.statuses[1].name = "done".to_string();
        let mut list = List::new(OwnerId::new(), "Chores", OrderKey::new(0.0), wf.id);
        list.items = vec![Item::new("Laundry", 1, wf.statuses[1].id)];
        assert_eq!(export_text(&list, &wf), "Done\n1x Laundry");
    }

    #[test]
    fn test_export_stale_status_under_first() {
        let wf = default_workflows().remove(0);
        let mut list = List::new(OwnerId::new(), "Chores", OrderKey::new(0.0), wf.id);
        list.items = vec![Item::new("Dishes", 1, StatusId::new())];
        assert_eq!(export_text(&list, &wf), "Needed\n1x Dishes");
    }

    #[test]
    fn test_export_empty_list() {
        let wf = default_workflows().remove(0);
        let list = List::new(OwnerId::new(), "Empty", OrderKey::new(0.0), wf.id);
        assert_eq!(export_text(&list, &wf), "");
    }
}
