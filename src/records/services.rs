use time::{format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime, UtcOffset};
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::CreateRecordRequest,
    repo_types::{NewRecord, Record},
    stats::{summarize, Summary},
};
use crate::error::{AppError, AppResult};
use crate::store::RecordStore;

pub const NOT_FOUND_MESSAGE: &str = "Record not found or not authorized";

fn require_user(user_id: Option<Uuid>) -> AppResult<Uuid> {
    user_id.ok_or(AppError::Unauthorized)
}

/// Accepts `YYYY-MM-DD`, or an RFC 3339 timestamp whose UTC date is used.
pub fn parse_record_date(raw: &str) -> Option<Date> {
    let raw = raw.trim();
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .ok()
        .or_else(|| {
            OffsetDateTime::parse(raw, &Rfc3339)
                .ok()
                .map(|t| t.to_offset(UtcOffset::UTC).date())
        })
}

/// The caller's records, newest date first.
pub async fn list(records: &dyn RecordStore, user_id: Option<Uuid>) -> AppResult<Vec<Record>> {
    let owner = require_user(user_id)?;
    Ok(records.list_by_owner(owner).await?)
}

/// Amount is stored as given; there is no range check.
pub async fn create(
    records: &dyn RecordStore,
    user_id: Option<Uuid>,
    input: CreateRecordRequest,
) -> AppResult<Record> {
    let owner = require_user(user_id)?;
    let raw_date = input.date.filter(|d| !d.trim().is_empty());
    let (Some(raw_date), Some(amount)) = (raw_date, input.amount) else {
        return Err(AppError::Validation("Missing required fields".into()));
    };
    let date = parse_record_date(&raw_date).ok_or_else(|| {
        warn!(date = %raw_date, "unparsable record date");
        AppError::Validation("Invalid date".into())
    })?;

    let rec = records
        .insert(NewRecord {
            user_id: owner,
            date,
            amount,
            text: input.text.unwrap_or_default(),
        })
        .await?;
    info!(record_id = %rec.id, user_id = %owner, "record created");
    Ok(rec)
}

/// Deletes only the caller's own record. Someone else's record, an unknown
/// id and an id that is not a UUID all look the same: not found.
pub async fn delete(
    records: &dyn RecordStore,
    user_id: Option<Uuid>,
    record_id: &str,
) -> AppResult<()> {
    let owner = require_user(user_id)?;
    let not_found = || AppError::NotFound(NOT_FOUND_MESSAGE.into());
    let id = Uuid::parse_str(record_id).map_err(|_| not_found())?;
    if !records.delete_owned(owner, id).await? {
        warn!(record_id = %id, user_id = %owner, "delete matched nothing");
        return Err(not_found());
    }
    info!(record_id = %id, user_id = %owner, "record deleted");
    Ok(())
}

pub async fn summary(records: &dyn RecordStore, user_id: Option<Uuid>) -> AppResult<Summary> {
    let rows = list(records, user_id).await?;
    Ok(summarize(&rows))
}
