use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::*;

use crate::entity::attempt_rate_bucket;
use crate::error::AppError;

/// Seconds per rate-limit bucket.
const BUCKET_SECONDS: i64 = 60;

/// Minute bucket index for a timestamp.
pub fn bucket_of(at: DateTime<Utc>) -> i64 {
    at.timestamp().div_euclid(BUCKET_SECONDS)
}

/// Seconds until the bucket containing `at` rolls over.
pub fn seconds_until_next_bucket(at: DateTime<Utc>) -> u64 {
    (BUCKET_SECONDS - at.timestamp().rem_euclid(BUCKET_SECONDS)) as u64
}

/// Record one submission and enforce the per-minute budget.
///
/// The counter row is bumped with an atomic upsert-increment, so two racing
/// submissions cannot both observe a stale count and slip under the limit.
/// A reader racing the increment can only see a count that is too high,
/// which over-rejects, never over-admits. Rejected submissions keep their
/// increment; they never create attempts, so this only shrinks the budget
/// of someone already over it.
pub async fn note_and_check(
    db: &DatabaseConnection,
    contest_id: i32,
    participant_id: i32,
    limit_per_minute: u32,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if limit_per_minute == 0 {
        return Ok(()); // Rate limiting disabled
    }

    let bucket = bucket_of(now);

    // Make sure the bucket row exists, then bump it in place.
    let insert = attempt_rate_bucket::Entity::insert(attempt_rate_bucket::ActiveModel {
        contest_id: Set(contest_id),
        participant_id: Set(participant_id),
        bucket: Set(bucket),
        count: Set(0),
    })
    .on_conflict(
        OnConflict::columns([
            attempt_rate_bucket::Column::ContestId,
            attempt_rate_bucket::Column::ParticipantId,
            attempt_rate_bucket::Column::Bucket,
        ])
        .do_nothing()
        .to_owned(),
    )
    .exec_without_returning(db)
    .await;
    match insert {
        Ok(_) | Err(DbErr::RecordNotInserted) => {}
        Err(e) => return Err(e.into()),
    }

    attempt_rate_bucket::Entity::update_many()
        .col_expr(
            attempt_rate_bucket::Column::Count,
            Expr::col(attempt_rate_bucket::Column::Count).add(1),
        )
        .filter(attempt_rate_bucket::Column::ContestId.eq(contest_id))
        .filter(attempt_rate_bucket::Column::ParticipantId.eq(participant_id))
        .filter(attempt_rate_bucket::Column::Bucket.eq(bucket))
        .exec(db)
        .await?;

    let row = attempt_rate_bucket::Entity::find_by_id((contest_id, participant_id, bucket))
        .one(db)
        .await?
        .ok_or_else(|| AppError::Internal("rate bucket missing after upsert".into()))?;

    if row.count > limit_per_minute as i32 {
        return Err(AppError::RateLimited {
            retry_after: seconds_until_next_bucket(now),
        });
    }

    // Stale buckets are useless after two rollovers; drop them as we go.
    attempt_rate_bucket::Entity::delete_many()
        .filter(attempt_rate_bucket::Column::ContestId.eq(contest_id))
        .filter(attempt_rate_bucket::Column::ParticipantId.eq(participant_id))
        .filter(attempt_rate_bucket::Column::Bucket.lt(bucket - 1))
        .exec(db)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_within_a_minute_share_a_bucket() {
        let a = Utc.with_ymd_and_hms(2024, 5, 1, 12, 3, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 5, 1, 12, 3, 59).unwrap();
        assert_eq!(bucket_of(a), bucket_of(b));
    }

    #[test]
    fn buckets_roll_over_each_minute() {
        let a = Utc.with_ymd_and_hms(2024, 5, 1, 12, 3, 59).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 5, 1, 12, 4, 0).unwrap();
        assert_eq!(bucket_of(b), bucket_of(a) + 1);
    }

    #[test]
    fn retry_after_counts_down_to_the_rollover() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 3, 45).unwrap();
        assert_eq!(seconds_until_next_bucket(t), 15);
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 3, 0).unwrap();
        assert_eq!(seconds_until_next_bucket(start), 60);
    }
}
