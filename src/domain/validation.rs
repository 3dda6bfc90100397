/// Order Validator - Business Rule Validation
///
/// Every order is checked before it reaches a book, both on the submitting
/// peer (raw user input) and on receiving peers (orders decoded off the
/// wire). Books rely on this for their "quantities are strictly positive"
/// invariant.
///
/// ## Validation Rules
/// - Side must be exactly `buy` or `sell`
/// - Price and quantity must parse as decimals and be positive
/// - Order id must not be empty
/// - Optional upper bounds on price and quantity
///
/// ## Usage
/// ```rust
/// use p2p_exchange::domain::validation::OrderValidator;
///
/// let validator = OrderValidator::new();
/// let params = validator.parse_submission("buy", "100.5", "2").unwrap();
/// assert_eq!(params.price.to_string(), "100.5");
/// assert!(validator.parse_submission("buy", "abc", "2").is_err());
/// ```

use crate::domain::entities::{Order, Side};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Side is not `buy` or `sell`
    #[error("Invalid side: {0}")]
    InvalidSide(String),

    /// Price is not a number, zero or negative
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    /// Quantity is not a number, zero or negative
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Order id is empty
    #[error("Invalid order id: {0}")]
    InvalidId(String),

    /// Price exceeds maximum allowed
    #[error("Price out of range: {0}")]
    PriceOutOfRange(String),

    /// Quantity exceeds maximum allowed
    #[error("Quantity out of range: {0}")]
    QuantityOutOfRange(String),
}

/// Order validation configuration
#[derive(Debug, Clone, Default)]
pub struct ValidationConfig {
    /// Maximum price (inclusive), unbounded when `None`
    pub max_price: Option<Decimal>,

    /// Maximum quantity (inclusive), unbounded when `None`
    pub max_quantity: Option<Decimal>,
}

/// Parsed and checked parameters of a new order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderParams {
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
}

/// Order validator
#[derive(Debug, Clone, Default)]
pub struct OrderValidator {
    config: ValidationConfig,
}

impl OrderValidator {
    /// Creates a new validator with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new validator with custom configuration
    pub fn with_config(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Parses raw submission input.
    ///
    /// Non-numeric prices and quantities are rejected here instead of being
    /// let into the book.
    pub fn parse_submission(
        &self,
        side: &str,
        price: &str,
        quantity: &str,
    ) -> Result<OrderParams, ValidationError> {
        let side = Side::from_str(side.trim())
            .map_err(|e| ValidationError::InvalidSide(e.0))?;
        let price = Decimal::from_str(price.trim())
            .map_err(|_| ValidationError::InvalidPrice(format!("{:?} is not a number", price)))?;
        let quantity = Decimal::from_str(quantity.trim())
            .map_err(|_| {
                ValidationError::InvalidQuantity(format!("{:?} is not a number", quantity))
            })?;

        self.validate_price(price)?;
        self.validate_quantity(quantity)?;

        Ok(OrderParams { side, price, quantity })
    }

    /// Validates a fully built order (e.g. one received from a peer)
    pub fn validate(&self, order: &Order) -> Result<(), ValidationError> {
        if order.id.trim().is_empty() {
            return Err(ValidationError::InvalidId("Order id cannot be empty".to_string()));
        }

        self.validate_price(order.price)?;
        self.validate_quantity(order.quantity)?;

        Ok(())
    }

    fn validate_price(&self, price: Decimal) -> Result<(), ValidationError> {
        if price <= Decimal::ZERO {
            return Err(ValidationError::InvalidPrice(format!(
                "Price must be greater than zero, got {}",
                price
            )));
        }

        if let Some(max) = self.config.max_price {
            if price > max {
                return Err(ValidationError::PriceOutOfRange(format!(
                    "Price {} exceeds maximum {}",
                    price, max
                )));
            }
        }

        Ok(())
    }

    fn validate_quantity(&self, quantity: Decimal) -> Result<(), ValidationError> {
        if quantity <= Decimal::ZERO {
            return Err(ValidationError::InvalidQuantity(format!(
                "Quantity must be greater than zero, got {}",
                quantity
            )));
        }

        if let Some(max) = self.config.max_quantity {
            if quantity > max {
                return Err(ValidationError::QuantityOutOfRange(format!(
                    "Quantity {} exceeds maximum {}",
                    quantity, max
                )));
            }
        }

        Ok(())
    }
}
