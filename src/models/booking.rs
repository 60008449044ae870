//! Booking model, service-level statuses and create requests

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

// ---------------------------------------------------------------------------
// Statuses
// ---------------------------------------------------------------------------

/// Status of one service inside a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceStatus {
    Scheduled,
    Confirmed,
    Arrived,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl ServiceStatus {
    /// Statuses whose interval still occupies the employee's time
    pub const HELD: [ServiceStatus; 4] = [
        ServiceStatus::Scheduled,
        ServiceStatus::Confirmed,
        ServiceStatus::Arrived,
        ServiceStatus::InProgress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Scheduled => "scheduled",
            ServiceStatus::Confirmed => "confirmed",
            ServiceStatus::Arrived => "arrived",
            ServiceStatus::InProgress => "in-progress",
            ServiceStatus::Completed => "completed",
            ServiceStatus::Cancelled => "cancelled",
            ServiceStatus::NoShow => "no-show",
        }
    }

    pub fn is_held(&self) -> bool {
        Self::HELD.contains(self)
    }

    /// Parse a status coming from a client, accepting booking-level aliases
    pub fn from_request(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "booked" | "pending" => Some(ServiceStatus::Scheduled),
            "started" => Some(ServiceStatus::InProgress),
            other => other.parse().ok(),
        }
    }
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ServiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(ServiceStatus::Scheduled),
            "confirmed" => Ok(ServiceStatus::Confirmed),
            "arrived" => Ok(ServiceStatus::Arrived),
            "in-progress" => Ok(ServiceStatus::InProgress),
            "completed" => Ok(ServiceStatus::Completed),
            "cancelled" => Ok(ServiceStatus::Cancelled),
            "no-show" => Ok(ServiceStatus::NoShow),
            _ => Err(format!("Invalid service status: {}", s)),
        }
    }
}

/// Aggregate booking status, derived from its services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    Booked,
    Confirmed,
    Arrived,
    Started,
    Completed,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Booked => "booked",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Arrived => "arrived",
            BookingStatus::Started => "started",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::NoShow => "no-show",
        }
    }

    /// Derive the booking status from its service statuses, by priority
    pub fn aggregate(statuses: &[ServiceStatus]) -> Self {
        let total = statuses.len();
        let count = |wanted: ServiceStatus| statuses.iter().filter(|s| **s == wanted).count();

        let completed = count(ServiceStatus::Completed);
        if total == 0 {
            BookingStatus::Booked
        } else if completed == total {
            BookingStatus::Completed
        } else if count(ServiceStatus::NoShow) == total {
            BookingStatus::NoShow
        } else if count(ServiceStatus::Cancelled) == total {
            BookingStatus::Cancelled
        } else if count(ServiceStatus::InProgress) > 0 || completed > 0 {
            BookingStatus::Started
        } else if count(ServiceStatus::Arrived) > 0 {
            BookingStatus::Arrived
        } else if count(ServiceStatus::Confirmed) > 0 {
            BookingStatus::Confirmed
        } else {
            BookingStatus::Booked
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "booked" => Ok(BookingStatus::Booked),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "arrived" => Ok(BookingStatus::Arrived),
            "started" => Ok(BookingStatus::Started),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "no-show" => Ok(BookingStatus::NoShow),
            _ => Err(format!("Invalid booking status: {}", s)),
        }
    }
}

// ---------------------------------------------------------------------------
// Payment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    #[serde(alias = "gift_card")]
    GiftCard,
    Membership,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::GiftCard => "giftcard",
            PaymentMethod::Membership => "membership",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "giftcard" | "gift_card" => Ok(PaymentMethod::GiftCard),
            "membership" => Ok(PaymentMethod::Membership),
            _ => Err(format!("Invalid payment method: {}", s)),
        }
    }
}

/// Method-specific payment data, stored as JSON on the booking
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PaymentDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gift_card_id: Option<i32>,
    /// Amount the client asked to take from the gift card
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub redeem_amount: Option<Decimal>,
    /// Amount actually taken at booking time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub redeemed_amount: Option<Decimal>,
    /// Set when a gift card was given but could not be charged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redemption_skipped: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub membership_id: Option<i32>,
}

// ---------------------------------------------------------------------------
// Booking
// ---------------------------------------------------------------------------

/// Half-open time interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// Interval occupied by an employee through a held booking service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeldInterval {
    pub employee_id: i32,
    pub interval: Interval,
}

/// One service performed within a booking
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingService {
    pub id: i32,
    pub service_id: i32,
    pub employee_id: i32,
    /// Price copied from the service at booking time
    #[schema(value_type = String)]
    pub price: Decimal,
    /// Duration (minutes) copied from the service at booking time
    pub duration: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ServiceStatus,
    pub notes: Option<String>,
}

impl BookingService {
    pub fn interval(&self) -> Interval {
        Interval::new(self.start_time, self.end_time)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Booking {
    pub id: i32,
    pub booking_number: String,
    pub client_id: i32,
    /// Calendar day of the appointment
    pub appointment_date: NaiveDate,
    pub services: Vec<BookingService>,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    /// Minutes
    pub total_duration: i32,
    #[schema(value_type = String)]
    pub discount_amount: Decimal,
    #[schema(value_type = String)]
    pub tax_amount: Decimal,
    #[schema(value_type = String)]
    pub final_amount: Decimal,
    pub payment_method: Option<PaymentMethod>,
    pub payment_details: PaymentDetails,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn service_statuses(&self) -> Vec<ServiceStatus> {
        self.services.iter().map(|s| s.status).collect()
    }

    pub fn recompute_status(&mut self) {
        self.status = BookingStatus::aggregate(&self.service_statuses());
    }

    /// Recompute totals and the amount left to pay after services changed
    pub fn recompute_totals(&mut self) {
        self.total_amount = self.services.iter().map(|s| s.price).sum();
        self.total_duration = self.services.iter().map(|s| s.duration).sum();
        self.final_amount = amount_due(
            self.total_amount,
            self.discount_amount,
            self.tax_amount,
            self.payment_method,
            self.payment_details.redeemed_amount,
        );
    }

    pub fn is_all(&self, status: ServiceStatus) -> bool {
        !self.services.is_empty() && self.services.iter().all(|s| s.status == status)
    }
}

/// What the client still owes: `total - discount + tax`, less any gift card
/// redemption, floored at zero. Memberships cover the whole booking.
pub fn amount_due(
    total: Decimal,
    discount: Decimal,
    tax: Decimal,
    method: Option<PaymentMethod>,
    redeemed: Option<Decimal>,
) -> Decimal {
    if method == Some(PaymentMethod::Membership) {
        return Decimal::ZERO;
    }
    let gross = total - discount + tax;
    (gross - redeemed.unwrap_or(Decimal::ZERO)).max(Decimal::ZERO)
}

/// Booking ready to be committed by the store
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub booking_number: String,
    pub client_id: i32,
    pub appointment_date: NaiveDate,
    pub services: Vec<NewBookingService>,
    pub total_amount: Decimal,
    pub total_duration: i32,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub final_amount: Decimal,
    pub payment_method: Option<PaymentMethod>,
    pub payment_details: PaymentDetails,
    pub status: BookingStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewBookingService {
    pub service_id: i32,
    pub employee_id: i32,
    pub price: Decimal,
    pub duration: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub notes: Option<String>,
}

impl NewBookingService {
    pub fn interval(&self) -> Interval {
        Interval::new(self.start_time, self.end_time)
    }
}

/// Gift card charge applied in the same commit as the booking
#[derive(Debug, Clone)]
pub struct Redemption {
    pub gift_card_id: i32,
    pub requested: Option<Decimal>,
}

/// Gift card balance forfeited in the same commit as a status change
#[derive(Debug, Clone)]
pub struct Forfeiture {
    pub gift_card_id: i32,
    pub amount: Decimal,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Employee requested for a service: a specific one or whoever is free
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum EmployeeChoice {
    #[default]
    Any,
    Specific(i32),
}

impl<'de> Deserialize<'de> for EmployeeChoice {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Id(i32),
            Text(String),
        }

        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(EmployeeChoice::Any),
            Some(Raw::Id(id)) => Ok(EmployeeChoice::Specific(id)),
            Some(Raw::Text(text)) => {
                let trimmed = text.trim();
                if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("any") {
                    Ok(EmployeeChoice::Any)
                } else {
                    trimmed.parse().map(EmployeeChoice::Specific).map_err(|_| {
                        de::Error::custom(format!("invalid employee reference: {}", text))
                    })
                }
            }
        }
    }
}

/// One requested service in a create-booking payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RequestedService {
    #[serde(default, alias = "service")]
    #[validate(required(message = "Service id missing on one of the service entries"))]
    pub service_id: Option<i32>,
    /// Employee id, or "any"
    #[serde(default, alias = "employee_id")]
    #[schema(value_type = Option<String>, example = "any")]
    pub employee: EmployeeChoice,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Payment data sent with a create-booking payload
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PaymentDetailsRequest {
    pub gift_card_id: Option<i32>,
    #[schema(value_type = Option<String>)]
    pub redeem_amount: Option<Decimal>,
    pub membership_id: Option<i32>,
}

/// Create booking request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBooking {
    /// Client id; defaults to the authenticated client
    pub client_id: Option<i32>,
    /// Appointment date (YYYY-MM-DD) or date-time (RFC 3339)
    #[validate(length(min = 1, message = "appointment_date is required"))]
    pub appointment_date: String,
    #[validate(length(min = 1, message = "At least one service is required"), nested)]
    pub services: Vec<RequestedService>,
    pub notes: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub payment_details: Option<PaymentDetailsRequest>,
    pub gift_card_code: Option<String>,
    #[schema(value_type = Option<String>)]
    pub discount_amount: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub tax_amount: Option<Decimal>,
}

/// Move a booking to a new start, keeping the gaps between its services
#[derive(Debug, Deserialize, ToSchema)]
pub struct RescheduleBooking {
    /// New start of the first service (RFC 3339)
    #[serde(alias = "newDateTime")]
    pub new_date_time: DateTime<Utc>,
}

/// Update service status request
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateServiceStatus {
    /// scheduled, confirmed, arrived, in-progress, completed, cancelled, no-show
    /// (booked, pending and started are accepted as aliases)
    pub status: String,
}

/// Result of a service status change
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceStatusChange {
    pub booking_id: i32,
    pub service_id: i32,
    pub status: ServiceStatus,
    pub booking_status: BookingStatus,
}

/// Result of removing a service from a booking
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceRemoval {
    pub booking_id: i32,
    pub service_id: i32,
    pub booking_deleted: bool,
}

/// Query parameters for the admin booking listing
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookingQuery {
    /// From this appointment date (YYYY-MM-DD)
    pub start_date: Option<String>,
    /// Until this appointment date, inclusive (YYYY-MM-DD)
    pub end_date: Option<String>,
}
