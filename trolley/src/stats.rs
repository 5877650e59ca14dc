//! Derived per-list statistics.

use crate::model::{Item, ListStatistics};

/// Compute the statistics projection for a list's items.
///
/// Pure and total. Callers recompute from scratch whenever item membership
/// or a purchased flag changes; the projection is never patched
/// incrementally, so it cannot drift from the items it describes.
pub fn list_statistics<'a>(items: impl IntoIterator<Item = &'a Item>) -> ListStatistics {
    let mut total = 0;
    let mut purchased = 0;
    for item in items {
        total += 1;
        if item.purchased {
            purchased += 1;
        }
    }
    let percentage = if total == 0 {
        0
    } else {
        ((purchased as f64 / total as f64) * 100.0).round() as u8
    };
    ListStatistics {
        total,
        purchased,
        pending: total - purchased,
        percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(purchased: bool) -> Item {
        Item {
            id: "1".to_string(),
            name: "Milk".to_string(),
            quantity: 1.0,
            unit: "l".to_string(),
            purchased,
            optional: false,
            notes: String::new(),
        }
    }

    #[test]
    fn empty_list_is_all_zero() {
        let items: Vec<Item> = Vec::new();
        let statistics = list_statistics(&items);
        assert_eq!(statistics, ListStatistics::default());
    }

    #[test]
    fn counts_split_by_purchased_flag() {
        let items = vec![item(true), item(false), item(true), item(false)];
        let statistics = list_statistics(&items);
        assert_eq!(statistics.total, 4);
        assert_eq!(statistics.purchased, 2);
        assert_eq!(statistics.pending, 2);
        assert_eq!(statistics.percentage, 50);
    }

    #[test]
    fn percentage_rounds_to_nearest_integer() {
        let one_of_three = list_statistics(&[item(true), item(false), item(false)]);
        assert_eq!(one_of_three.percentage, 33);

        let two_of_three = list_statistics(&[item(true), item(true), item(false)]);
        assert_eq!(two_of_three.percentage, 67);
    }

    #[test]
    fn counts_always_reconcile() {
        for total in 0..=8usize {
            for purchased in 0..=total {
                let items: Vec<Item> = (0..total).map(|i| item(i < purchased)).collect();
                let statistics = list_statistics(&items);
                assert_eq!(statistics.total, total);
                assert_eq!(statistics.purchased, purchased);
                assert_eq!(statistics.purchased + statistics.pending, statistics.total);
                if total == 0 {
                    assert_eq!(statistics.percentage, 0);
                } else {
                    let expected = ((purchased as f64 / total as f64) * 100.0).round() as u8;
                    assert_eq!(statistics.percentage, expected);
                }
            }
        }
    }
}
