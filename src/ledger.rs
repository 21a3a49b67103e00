//! Assignment ledger rules
//!
//! Pure decisions taken against the locked state of a device. The repository
//! layer loads a [`DeviceOccupancy`] inside its transaction, asks these
//! functions what to do, and applies the answer.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use crate::{
    error::{AppError, AppResult, Conflict, InvalidTransition},
    models::{
        enums::{DeviceStatus, LineStatus},
        history::DeviceHistoryEntry,
    },
};

/// Open custody record currently holding a device
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct OpenCustody {
    pub id: i32,
    pub employee_matricula: String,
    pub delivery_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Open aggregates referencing a device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceOccupancy {
    pub open_custody: Option<OpenCustody>,
    pub open_order_id: Option<i32>,
}

impl DeviceOccupancy {
    /// Status the device must carry given its open aggregates.
    ///
    /// Both kinds open at once is a broken invariant and aborts the caller's
    /// transaction.
    pub fn status(&self) -> AppResult<DeviceStatus> {
        DeviceStatus::derive(self.open_custody.is_some(), self.open_order_id.is_some()).ok_or_else(
            || {
                AppError::Internal(format!(
                    "device has open custody record {:?} and open maintenance order {:?}",
                    self.open_custody.as_ref().map(|c| c.id),
                    self.open_order_id
                ))
            },
        )
    }
}

/// What a check-out request should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutDecision {
    /// Create a new custody record
    Proceed,
    /// Same request submitted again moments ago: hand back this record
    Existing(i32),
}

/// Decide a check-out against the current occupancy of the device.
///
/// An open record for the same employee and delivery date created within
/// `window` is a duplicate submission rather than a conflict.
pub fn check_out_decision(
    occupancy: &DeviceOccupancy,
    employee_matricula: &str,
    delivery_date: NaiveDate,
    now: DateTime<Utc>,
    window: Duration,
) -> Result<CheckOutDecision, Conflict> {
    if let Some(open) = &occupancy.open_custody {
        let age = now.signed_duration_since(open.created_at);
        if open.employee_matricula == employee_matricula
            && open.delivery_date == delivery_date
            && age >= Duration::zero()
            && age <= window
        {
            return Ok(CheckOutDecision::Existing(open.id));
        }
        return Err(Conflict::DeviceAlreadyAssigned {
            conflicting_record_id: open.id,
        });
    }

    if let Some(order_id) = occupancy.open_order_id {
        return Err(Conflict::DeviceUnderMaintenance {
            conflicting_order_id: order_id,
        });
    }

    Ok(CheckOutDecision::Proceed)
}

/// A device may enter maintenance only when nothing else holds it
pub fn maintenance_guard(occupancy: &DeviceOccupancy) -> Result<(), Conflict> {
    if let Some(open) = &occupancy.open_custody {
        return Err(Conflict::DeviceAlreadyAssigned {
            conflicting_record_id: open.id,
        });
    }
    if let Some(order_id) = occupancy.open_order_id {
        return Err(Conflict::DeviceUnderMaintenance {
            conflicting_order_id: order_id,
        });
    }
    Ok(())
}

/// A line can be inserted into a device unless the line is cancelled or the
/// device is out for repair
pub fn link_guard(numero: &str, line_status: LineStatus, occupancy: &DeviceOccupancy) -> AppResult<()> {
    if line_status == LineStatus::Cancelled {
        return Err(InvalidTransition::LineCancelled {
            numero: numero.to_string(),
        }
        .into());
    }
    if let Some(order_id) = occupancy.open_order_id {
        return Err(Conflict::DeviceUnderMaintenance {
            conflicting_order_id: order_id,
        }
        .into());
    }
    Ok(())
}

/// Closing date of an interval may not precede its start
pub fn ensure_not_before(start: NaiveDate, end: NaiveDate, what: &str) -> AppResult<()> {
    if end < start {
        return Err(AppError::Validation(format!(
            "{} ({}) cannot be earlier than {}",
            what, end, start
        )));
    }
    Ok(())
}

/// Human-facing maintenance order number, e.g. `OS-2024-00001`
pub fn format_order_number(year: i32, sequence: i32) -> String {
    format!("OS-{:04}-{:05}", year, sequence)
}

/// Year whose counter numbers an order sent on `send_date`
pub fn order_year(send_date: NaiveDate) -> i32 {
    send_date.year()
}

/// Merge custody and maintenance intervals into one chronological timeline.
///
/// Ordered by start date, ties broken by creation time.
pub fn device_timeline<C, M>(custody: C, maintenance: M) -> Vec<DeviceHistoryEntry>
where
    C: IntoIterator,
    C::Item: Into<DeviceHistoryEntry>,
    M: IntoIterator,
    M::Item: Into<DeviceHistoryEntry>,
{
    let mut entries: Vec<DeviceHistoryEntry> = custody
        .into_iter()
        .map(Into::into)
        .chain(maintenance.into_iter().map(Into::into))
        .collect();
    entries.sort_by_key(|e| (e.start_date(), e.recorded_at()));
    entries
}
