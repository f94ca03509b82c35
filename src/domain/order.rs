use serde::{Deserialize, Serialize};
use std::fmt;

/// Delivery progress of an order.
///
/// Progress is strictly linear: Placed -> Preparing -> Out for Delivery ->
/// Delivered. An order whose stored status is not recognized is `Unknown`
/// and never advances; see [`Order::unrecognized_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Placed,
    Preparing,
    #[serde(rename = "Out for Delivery")]
    OutForDelivery,
    Delivered,
    Unknown,
}

impl OrderStatus {
    /// The status that follows this one, or `None` for terminal states.
    pub fn next(self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Placed => Some(OrderStatus::Preparing),
            OrderStatus::Preparing => Some(OrderStatus::OutForDelivery),
            OrderStatus::OutForDelivery => Some(OrderStatus::Delivered),
            OrderStatus::Delivered | OrderStatus::Unknown => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }

    /// Message shown to the customer once this status is reached.
    pub fn progress_message(self) -> &'static str {
        match self {
            OrderStatus::Placed => "Order placed successfully!",
            OrderStatus::Preparing => "Your order is being prepared.",
            OrderStatus::OutForDelivery => "Your order is out for delivery.",
            OrderStatus::Delivered => "Your order has been delivered.",
            OrderStatus::Unknown => "Order status is unavailable.",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OrderStatus::Placed => "Placed",
            OrderStatus::Preparing => "Preparing",
            OrderStatus::OutForDelivery => "Out for Delivery",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryPersonnel {
    pub name: String,
    pub phone: String,
}

/// Represents a customer order. One order is created per cart line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "OrderRecord", into = "OrderRecord")]
pub struct Order {
    pub id: String,
    pub product_name: String,
    pub quantity: u32,
    pub status: OrderStatus,
    /// Stored status text that matched no known status. Only set while
    /// `status` is `Unknown`, and written back in place of it.
    pub unrecognized_status: Option<String>,
    /// 0 means not rated yet.
    pub rating: u8,
    pub tracking_id: Option<String>,
    pub tracking_url: Option<String>,
    pub delivery_personnel: Option<DeliveryPersonnel>,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum StatusRecord {
    Known(OrderStatus),
    Other(String),
}

/// The JSON shape of an [`Order`].
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderRecord {
    id: String,
    product_name: String,
    quantity: u32,
    status: StatusRecord,
    #[serde(default)]
    rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tracking_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tracking_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    delivery_personnel: Option<DeliveryPersonnel>,
}

impl From<OrderRecord> for Order {
    fn from(record: OrderRecord) -> Self {
        let (status, unrecognized_status) = match record.status {
            StatusRecord::Known(status) => (status, None),
            StatusRecord::Other(text) => (OrderStatus::Unknown, Some(text)),
        };
        Self {
            id: record.id,
            product_name: record.product_name,
            quantity: record.quantity,
            status,
            unrecognized_status,
            rating: record.rating,
            tracking_id: record.tracking_id,
            tracking_url: record.tracking_url,
            delivery_personnel: record.delivery_personnel,
        }
    }
}

impl From<Order> for OrderRecord {
    fn from(order: Order) -> Self {
        let status = match (order.status, order.unrecognized_status) {
            (OrderStatus::Unknown, Some(text)) => StatusRecord::Other(text),
            (status, _) => StatusRecord::Known(status),
        };
        Self {
            id: order.id,
            product_name: order.product_name,
            quantity: order.quantity,
            status,
            rating: order.rating,
            tracking_id: order.tracking_id,
            tracking_url: order.tracking_url,
            delivery_personnel: order.delivery_personnel,
        }
    }
}

/// Parameters for creating a new order.
#[derive(Debug, Clone)]
pub struct OrderCreate {
    pub product_name: String,
    pub quantity: u32,
}

impl OrderCreate {
    /// Checkout always orders a single unit per cart line.
    pub fn single(product_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            quantity: 1,
        }
    }
}

/// Tracking and courier details attached to an order after dispatch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeliveryAssignment {
    pub tracking_id: Option<String>,
    pub tracking_url: Option<String>,
    pub delivery_personnel: Option<DeliveryPersonnel>,
}

/// What the tracking dialog shows for an order.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingInfo {
    pub order_id: String,
    pub status: OrderStatus,
    pub tracking_id: Option<String>,
    pub tracking_url: Option<String>,
}

impl fmt::Display for TrackingInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Order ID: {}", self.order_id)?;
        writeln!(f, "Status: {}", self.status)?;
        write!(
            f,
            "Tracking ID: {}",
            self.tracking_id.as_deref().unwrap_or("Not available yet")
        )?;
        if let Some(url) = &self.tracking_url {
            write!(f, "\nLive tracking: {}", url)?;
        }
        Ok(())
    }
}

impl Order {
    pub fn tracking_info(&self) -> TrackingInfo {
        TrackingInfo {
            order_id: self.id.clone(),
            status: self.status,
            tracking_id: self.tracking_id.clone(),
            tracking_url: self.tracking_url.clone(),
        }
    }

    /// The status as stored, including text this crate does not recognize.
    pub fn status_text(&self) -> String {
        match &self.unrecognized_status {
            Some(text) if self.status == OrderStatus::Unknown => text.clone(),
            _ => self.status.to_string(),
        }
    }

    pub fn is_rated(&self) -> bool {
        self.rating > 0
    }
}
