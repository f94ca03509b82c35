use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

use crate::actor_framework::Entity;
use crate::domain::{Order, OrderCreate, OrderStatus};
use super::actions::{OrderAction, OrderActionResult};
use super::error::OrderError;

const ID_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

impl Entity for Order {
    type Id = String;
    type CreateParams = OrderCreate;
    type Action = OrderAction;
    type ActionResult = OrderActionResult;
    type Error = OrderError;

    const NAMESPACE: &'static str = "orders";

    fn id(&self) -> &String {
        &self.id
    }

    /// Creates a new Order from creation parameters.
    ///
    /// # Notes
    /// The order starts as `Placed` and unrated.
    fn from_create_params(id: String, params: OrderCreate) -> Result<Self, OrderError> {
        if params.quantity == 0 {
            return Err(OrderError::ValidationError("Quantity must be at least 1".to_string()));
        }
        Ok(Self {
            id,
            product_name: params.product_name,
            quantity: params.quantity,
            status: OrderStatus::Placed,
            unrecognized_status: None,
            rating: 0,
            tracking_id: None,
            tracking_url: None,
            delivery_personnel: None,
        })
    }

    /// Imported orders must satisfy the same bounds that creation and
    /// rating enforce.
    fn validate(&self) -> Result<(), OrderError> {
        if self.quantity == 0 {
            return Err(OrderError::ValidationError("Quantity must be at least 1".to_string()));
        }
        if self.rating > 5 {
            return Err(OrderError::InvalidRating(self.rating));
        }
        Ok(())
    }

    /// Handles order-specific actions.
    ///
    /// # Actions
    /// - `Rate(n)`: sets the rating of a delivered order
    /// - `MarkDelivered`: finishes delivery; never moves an order backwards
    /// - `AssignDelivery`: merges tracking and courier details
    fn handle_action(&mut self, action: OrderAction) -> Result<OrderActionResult, OrderError> {
        match action {
            OrderAction::Rate(rating) => {
                if !(1..=5).contains(&rating) {
                    return Err(OrderError::InvalidRating(rating));
                }
                if self.status != OrderStatus::Delivered {
                    return Err(OrderError::NotDelivered {
                        id: self.id.clone(),
                        status: self.status,
                    });
                }
                self.rating = rating;
                Ok(OrderActionResult::Rate(self.clone()))
            }
            OrderAction::MarkDelivered => {
                if self.status != OrderStatus::Unknown {
                    self.status = OrderStatus::Delivered;
                }
                Ok(OrderActionResult::MarkDelivered(self.clone()))
            }
            OrderAction::AssignDelivery(assignment) => {
                if let Some(tracking_id) = assignment.tracking_id {
                    self.tracking_id = Some(tracking_id);
                }
                if let Some(tracking_url) = assignment.tracking_url {
                    self.tracking_url = Some(tracking_url);
                }
                if let Some(personnel) = assignment.delivery_personnel {
                    self.delivery_personnel = Some(personnel);
                }
                Ok(OrderActionResult::AssignDelivery(self.clone()))
            }
        }
    }
}

/// Order ids: current unix time in milliseconds followed by nine random
/// base-36 characters. The actor regenerates on the rare collision.
pub fn order_id_generator() -> impl Fn() -> String + Send + Sync + 'static {
    || {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or_default();
        let mut rng = rand::thread_rng();
        let suffix: String = (0..ID_SUFFIX_LEN)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        format!("{}{}", millis, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DeliveryAssignment, DeliveryPersonnel};

    fn delivered(id: &str) -> Order {
        let mut order = Order::from_create_params(id.to_string(), OrderCreate::single("Cement")).unwrap();
        order.status = OrderStatus::Delivered;
        order
    }

    #[test]
    fn test_new_order_is_placed_and_unrated() {
        let order = Order::from_create_params("o1".into(), OrderCreate::single("Bricks")).unwrap();
        assert_eq!(order.status, OrderStatus::Placed);
        assert_eq!(order.quantity, 1);
        assert_eq!(order.rating, 0);
    }

    #[test]
    fn test_rating_a_delivered_order_changes_only_rating() {
        let mut order = delivered("X");
        let before = order.clone();

        let rated = order.handle_action(OrderAction::Rate(4)).unwrap().into_order();
        assert_eq!(rated.rating, 4);
        assert_eq!(Order { rating: 0, ..rated }, before);
    }

    #[test]
    fn test_rating_requires_delivery() {
        let mut order = Order::from_create_params("o1".into(), OrderCreate::single("Bricks")).unwrap();
        let result = order.handle_action(OrderAction::Rate(5));
        assert_eq!(
            result,
            Err(OrderError::NotDelivered {
                id: "o1".into(),
                status: OrderStatus::Placed
            })
        );
        assert_eq!(order.rating, 0);
    }

    #[test]
    fn test_rating_out_of_range() {
        let mut order = delivered("X");
        assert_eq!(order.handle_action(OrderAction::Rate(0)), Err(OrderError::InvalidRating(0)));
        assert_eq!(order.handle_action(OrderAction::Rate(6)), Err(OrderError::InvalidRating(6)));
    }

    #[test]
    fn test_mark_delivered_is_idempotent() {
        let mut order = delivered("X");
        let before = order.clone();
        order.handle_action(OrderAction::MarkDelivered).unwrap();
        assert_eq!(order, before);
    }

    #[test]
    fn test_assign_delivery_merges_fields() {
        let mut order = delivered("X");
        order.tracking_id = Some("TRK-1".into());
        order
            .handle_action(OrderAction::AssignDelivery(DeliveryAssignment {
                tracking_id: None,
                tracking_url: Some("https://track.example/TRK-1".into()),
                delivery_personnel: Some(DeliveryPersonnel {
                    name: "Ravi".into(),
                    phone: "+91 98765 43210".into(),
                }),
            }))
            .unwrap();
        assert_eq!(order.tracking_id.as_deref(), Some("TRK-1"));
        assert!(order.tracking_url.is_some());
        assert!(order.delivery_personnel.is_some());
    }

    #[test]
    fn test_validate_rejects_out_of_range_fields() {
        let order = delivered("X");
        assert_eq!(order.validate(), Ok(()));
        assert_eq!(Order { rating: 5, ..order.clone() }.validate(), Ok(()));
        assert_eq!(Order { rating: 9, ..order.clone() }.validate(), Err(OrderError::InvalidRating(9)));
        assert!(matches!(
            Order { quantity: 0, ..order }.validate(),
            Err(OrderError::ValidationError(_))
        ));
    }

    #[test]
    fn test_order_id_shape() {
        let next = order_id_generator();
        let id = next();
        let (millis, suffix) = id.split_at(id.len() - ID_SUFFIX_LEN);
        assert!(millis.parse::<u128>().is_ok());
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_ne!(next(), id);
    }
}
