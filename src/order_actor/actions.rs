use crate::domain::{DeliveryAssignment, Order};

/// Custom actions for Order entities.
#[derive(Debug, Clone)]
pub enum OrderAction {
    /// Sets the star rating.
    ///
    /// # Errors
    /// Fails unless the order is Delivered and the rating is within 1..=5.
    Rate(u8),
    /// Moves the order to Delivered. Already delivered orders are unchanged.
    MarkDelivered,
    /// Attaches tracking and courier details. `None` fields are left as they are.
    AssignDelivery(DeliveryAssignment),
}

/// Results from OrderActions - variants match 1:1 with OrderAction
#[derive(Debug, Clone, PartialEq)]
pub enum OrderActionResult {
    Rate(Order),
    MarkDelivered(Order),
    AssignDelivery(Order),
}

impl OrderActionResult {
    pub fn into_order(self) -> Order {
        match self {
            OrderActionResult::Rate(order)
            | OrderActionResult::MarkDelivered(order)
            | OrderActionResult::AssignDelivery(order) => order,
        }
    }
}
