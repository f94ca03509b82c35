use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Payment method chosen at checkout. Only a label: nothing is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "COD")]
    CashOnDelivery,
    #[serde(rename = "UPI")]
    Upi,
    #[serde(rename = "NEFT")]
    Neft,
    BankTransfer,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentMethod::CashOnDelivery => "COD",
            PaymentMethod::Upi => "UPI",
            PaymentMethod::Neft => "NEFT",
            PaymentMethod::BankTransfer => "BankTransfer",
        };
        f.write_str(label)
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cod" => Ok(PaymentMethod::CashOnDelivery),
            "upi" => Ok(PaymentMethod::Upi),
            "neft" => Ok(PaymentMethod::Neft),
            "banktransfer" | "bank-transfer" => Ok(PaymentMethod::BankTransfer),
            other => Err(format!("Unknown payment method: {}", other)),
        }
    }
}
