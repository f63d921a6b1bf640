//! Item and list field edits, with input validation.
//!
//! Validation happens before anything is touched: an `Err` means the list
//! is unchanged.

use tally_types::{Item, ItemId, List, StatusGroup};

use crate::error::{CoreError, ValidationError};
use crate::workflow::initial_status;
use crate::Result;

/// Trimmed name, or `EmptyName`.
pub fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName.into());
    }
    Ok(trimmed.to_string())
}

pub fn validate_quantity(quantity: i64) -> Result<u32> {
    if quantity < 1 {
        return Err(ValidationError::NonPositiveQuantity(quantity).into());
    }
    u32::try_from(quantity).map_err(|_| ValidationError::QuantityTooLarge(quantity).into())
}

/// A new item in `workflow`'s first status.
pub fn new_item(name: &str, quantity: i64, workflow: &StatusGroup) -> Result<Item> {
    let name = validate_name(name)?;
    let quantity = validate_quantity(quantity)?;
    Ok(Item::new(name, quantity, initial_status(workflow)?))
}

fn item_mut(list: &mut List, id: ItemId) -> Result<&mut Item> {
    list.item_mut(id).ok_or(CoreError::ItemNotFound(id))
}

pub fn rename_item(list: &mut List, id: ItemId, name: &str) -> Result<()> {
    let name = validate_name(name)?;
    item_mut(list, id)?.name = name;
    Ok(())
}

pub fn set_quantity(list: &mut List, id: ItemId, quantity: i64) -> Result<()> {
    let quantity = validate_quantity(quantity)?;
    item_mut(list, id)?.quantity = quantity;
    Ok(())
}

/// Remove an item, returning it with its former index.
pub fn delete_item(list: &mut List, id: ItemId) -> Result<(usize, Item)> {
    let index = list.item_index(id).ok_or(CoreError::ItemNotFound(id))?;
    Ok((index, list.items.remove(index)))
}

pub fn rename_list(list: &mut List, name: &str) -> Result<()> {
    list.name = validate_name(name)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_types::{OrderKey, OwnerId, default_workflows};

    fn test_list() -> (List, StatusGroup) {
        let wf = default_workflows().remove(1);
        let mut list = List::new(OwnerId::new(), "Hardware", OrderKey::new(0.0), wf.id);
        list.items.push(new_item("Nails", 100, &wf).unwrap());
        list.items.push(new_item("Screws", 50, &wf).unwrap());
        (list, wf)
    }

    #[test]
    fn test_new_item_starts_in_first_status() {
        let (list, wf) = test_list();
        assert!(list.items.iter().all(|i| i.status == wf.statuses[0].id));
    }

    #[test]
    fn test_name_is_trimmed() {
        let wf = default_workflows().remove(0);
        assert_eq!(new_item("  Milk \n", 1, &wf).unwrap().name, "Milk");
    }

    #[test]
    fn test_rejects_empty_name() {
        let (mut list, wf) = test_list();
        assert_eq!(new_item("   ", 1, &wf).unwrap_err(), CoreError::Validation(ValidationError::EmptyName));
        let id = list.items[0].id;
        assert!(rename_item(&mut list, id, "").is_err());
        assert_eq!(list.items[0].name, "Nails");
        assert!(rename_list(&mut list, " ").is_err());
        assert_eq!(list.name, "Hardware");
    }

    #[test]
    fn test_rejects_non_positive_quantity() {
        let (mut list, wf) = test_list();
        assert_eq!(
            new_item("Glue", 0, &wf).unwrap_err(),
            CoreError::Validation(ValidationError::NonPositiveQuantity(0))
        );
        let id = list.items[1].id;
        assert!(set_quantity(&mut list, id, -3).is_err());
        assert_eq!(list.items[1].quantity, 50);
        assert!(matches!(
            validate_quantity(i64::MAX),
            Err(CoreError::Validation(ValidationError::QuantityTooLarge(_)))
        ));
    }

    #[test]
    fn test_edits() {
        let (mut list, _) = test_list();
        let id = list.items[0].id;
        rename_item(&mut list, id, "Brads").unwrap();
        set_quantity(&mut list, id, 3).unwrap();
        assert_eq!(list.items[0].name, "Brads");
        assert_eq!(list.items[0].quantity, 3);
    }

    #[test]
    fn test_delete_item() {
        let (mut list, _) = test_list();
        let id = list.items[1].id;
        let (index, item) = delete_item(&mut list, id).unwrap();
        assert_eq!(index, 1);
        assert_eq!(item.name, "Screws");
        assert_eq!(delete_item(&mut list, id).unwrap_err(), CoreError::ItemNotFound(id));
    }
}
