//! Command implementations over a loaded [`Session`].
//!
//! Every function here works on in-memory state and returns text; `main`
//! decides whether the queued writes are saved.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use tally_client::{DocumentStore, MemoryStore, Mutation, Session};
use tally_core::SortMode;
use tally_types::{ItemId, ListId, OwnerId, StoreSnapshot, resolve_prefix};

/// Read a snapshot file. A missing file is an empty store.
pub fn load_snapshot(path: &Path) -> Result<StoreSnapshot> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no data file, starting empty");
        return Ok(StoreSnapshot::default());
    }
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

pub fn save_snapshot(path: &Path, snapshot: &StoreSnapshot) -> Result<()> {
    let text = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

/// The owner to act as: explicit, else whoever owns the first list.
pub fn pick_owner(explicit: Option<&str>, snapshot: &StoreSnapshot) -> Result<OwnerId> {
    if let Some(raw) = explicit {
        return OwnerId::parse(raw).with_context(|| format!("invalid owner id '{raw}'"));
    }
    Ok(snapshot.lists.first().map(|l| l.owner_id).unwrap_or_default())
}

/// Apply queued writes to `snapshot` the way the store would.
pub async fn commit(owner: OwnerId, snapshot: StoreSnapshot, writes: Vec<Mutation>) -> Result<StoreSnapshot> {
    let store = MemoryStore::new();
    store.seed(owner, snapshot);
    for mutation in writes {
        let what = mutation.describe();
        store.mutate(mutation).await.with_context(|| format!("saving {what}"))?;
    }
    Ok(store.snapshot(owner))
}

pub fn find_list(session: &Session, query: &str) -> Result<ListId> {
    let entries = session.lists().iter().map(|l| (l.id, l.name.as_str()));
    Ok(resolve_prefix(entries, query)?)
}

pub fn find_item(session: &Session, list: ListId, query: &str) -> Result<ItemId> {
    let list = session.list(list).context("list vanished")?;
    let entries = list.items.iter().map(|i| (i.id, i.name.as_str()));
    Ok(resolve_prefix(entries, query)?)
}

/// One line per list, in display order.
pub fn lists(session: &Session) -> String {
    let mut out = String::new();
    for (index, list) in session.lists().iter().enumerate() {
        let workflow = session
            .workflow_of(list.id)
            .map(|w| w.name.as_str())
            .unwrap_or("?");
        let _ = writeln!(
            out,
            "{index:>3}  {}  {:<24} {:>3} items  [{workflow}]",
            list.id.short(),
            list.name,
            list.items.len(),
        );
    }
    if out.is_empty() {
        out.push_str("no lists\n");
    }
    out
}

/// A list's items as displayed under `sort` (or the list's current sort).
pub fn show(session: &mut Session, list: ListId, sort: Option<SortMode>) -> Result<String> {
    if let Some(sort) = sort {
        session.set_sort_mode(list, sort)?;
    }
    let items = session.render(list)?;
    let workflow = session.workflow_of(list)?;
    let name = session.list(list).map(|l| l.name.as_str()).unwrap_or_default();

    let mut out = String::new();
    let _ = writeln!(out, "{name} ({}, sort: {})", workflow.name, session.sort_mode(list));
    for (index, item) in items.iter().enumerate() {
        let (glyph, status) = match workflow.status(item.status) {
            Some(status) => (status.kind().glyph(), status.name.as_str()),
            None => ('?', "unknown"),
        };
        let _ = writeln!(out, "{index:>3}. {glyph} {}x {}  [{status}]", item.quantity, item.name);
    }
    Ok(out)
}

/// Move a list and describe what changed.
pub fn move_list(session: &mut Session, from: usize, to: usize) -> Result<String> {
    let plan = session.move_list(from, to)?;
    Ok(format!("{} list(s) rekeyed\n{}", plan.touched().len(), lists(session)))
}

/// Advance an item's status and describe the new one.
pub fn cycle(session: &mut Session, list: ListId, item: ItemId) -> Result<String> {
    let next = session.cycle_status(list, item)?;
    let workflow = session.workflow_of(list)?;
    let status = workflow.status(next).map(|s| s.name.as_str()).unwrap_or("?");
    let name = session
        .list(list)
        .and_then(|l| l.item(item))
        .map(|i| i.name.as_str())
        .unwrap_or_default();
    Ok(format!("{name} -> {status}\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::EngineConfig;
    use tally_types::{ConfigDocument, Item, List, OrderKey, default_workflows};

    fn sample() -> (Session, StoreSnapshot) {
        let owner = OwnerId::new();
        let purchasing = default_workflows().remove(1);
        let mut hardware = List::new(owner, "Hardware", OrderKey::new(10.0), purchasing.id);
        hardware.items = vec![
            Item::new("Screws", 2, purchasing.statuses[1].id),
            Item::new("Nails", 5, purchasing.statuses[0].id),
        ];
        let groceries = List::new(owner, "Groceries", OrderKey::new(20.0), default_workflows()[0].id);
        let snapshot = StoreSnapshot {
            lists: vec![groceries, hardware],
            config: Some(ConfigDocument::builtin()),
            history: vec![],
        };
        let mut session = Session::new(owner, EngineConfig::default());
        session.apply_snapshot(&snapshot);
        (session, snapshot)
    }

    #[test]
    fn test_lists_in_key_order() {
        let (session, _) = sample();
        let text = lists(&session);
        let hardware = text.find("Hardware").unwrap();
        let groceries = text.find("Groceries").unwrap();
        assert!(hardware < groceries);
        assert!(text.contains("[Purchasing]"));
    }

    #[test]
    fn test_show_by_status() {
        let (mut session, _) = sample();
        let list = find_list(&session, "hard").unwrap();
        let text = show(&mut session, list, Some(SortMode::Status)).unwrap();
        let nails = text.find("5x Nails").unwrap();
        let screws = text.find("2x Screws").unwrap();
        assert!(nails < screws);
        assert!(text.starts_with("Hardware (Purchasing, sort: status)"));
    }

    #[test]
    fn test_find_is_prefix_and_case_insensitive() {
        let (session, _) = sample();
        let list = find_list(&session, "GROC").unwrap();
        assert_eq!(session.list(list).unwrap().name, "Groceries");
        assert!(find_list(&session, "zzz").is_err());

        let hardware = find_list(&session, "Hardware").unwrap();
        let nails = find_item(&session, hardware, "nai").unwrap();
        assert_eq!(session.list(hardware).unwrap().item(nails).unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn test_cycle_and_commit() {
        let (mut session, snapshot) = sample();
        let owner = session.owner();
        let list = find_list(&session, "Hardware").unwrap();
        let item = find_item(&session, list, "Screws").unwrap();
        let text = cycle(&mut session, list, item).unwrap();
        assert_eq!(text, "Screws -> Received\n");

        let saved = commit(owner, snapshot, session.take_mutations()).await.unwrap();
        let hardware = saved.lists.iter().find(|l| l.id == list).unwrap();
        let received = default_workflows()[1].statuses[2].id;
        assert_eq!(hardware.item(item).unwrap().status, received);
    }

    #[test]
    fn test_snapshot_file_round_trip() {
        let (_, snapshot) = sample();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.json");
        assert_eq!(load_snapshot(&path).unwrap(), StoreSnapshot::default());
        save_snapshot(&path, &snapshot).unwrap();
        assert_eq!(load_snapshot(&path).unwrap(), snapshot);
    }

    #[test]
    fn test_owner_defaults_to_first_list() {
        let (_, snapshot) = sample();
        let owner = pick_owner(None, &snapshot).unwrap();
        assert_eq!(owner, snapshot.lists[0].owner_id);
        assert!(pick_owner(Some("not-a-uuid"), &snapshot).is_err());
    }
}
