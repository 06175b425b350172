//! Maintenance jobs run by the scheduler.
//!
//! Both jobs take the current time as an argument and are safe to repeat:
//! a second run over unchanged data finds nothing to do.

use chrono::{Duration, NaiveDateTime};
use model::entities::{appointment, prelude::*};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use tracing::{debug, error, info, instrument};

use crate::error::Result;

pub const DEFAULT_RETENTION_DAYS: i64 = 90;

/// Outcome of a no-show sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoShowReport {
    /// Past appointments still in an active status.
    pub matched: usize,
    pub converted: usize,
    /// Records whose save failed; they stay active for the next run.
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct CleanupJobs {
    db: DatabaseConnection,
    retention: Duration,
}

impl CleanupJobs {
    pub fn new(db: DatabaseConnection, retention: Duration) -> Self {
        Self { db, retention }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Moves every active appointment dated before `now` to `NO_SHOW`.
    ///
    /// Records are saved one by one; a failed save is logged and skipped.
    #[instrument(skip(self))]
    pub async fn mark_past_as_no_show(&self, now: NaiveDateTime) -> Result<NoShowReport> {
        let stale = Appointment::find()
            .filter(appointment::Column::AppointmentDate.lt(now))
            .filter(appointment::Column::Status.is_in(AppointmentStatus::ACTIVE))
            .all(&self.db)
            .await?;

        let mut report = NoShowReport {
            matched: stale.len(),
            ..Default::default()
        };
        debug!(matched = report.matched, "Found stale appointments");

        for record in stale {
            let id = record.id;
            let mut active: appointment::ActiveModel = record.into();
            active.status = Set(AppointmentStatus::NoShow);
            active.updated_at = Set(now);

            match active.update(&self.db).await {
                Ok(_) => report.converted += 1,
                Err(e) => {
                    error!(appointment_id = id, "Failed to mark appointment as no-show: {}", e);
                    report.failed += 1;
                }
            }
        }

        info!(
            converted = report.converted,
            failed = report.failed,
            "Marked past appointments as no-show"
        );
        Ok(report)
    }

    /// Deletes cancelled appointments last touched before `now - retention`.
    /// Returns the number of rows removed.
    #[instrument(skip(self))]
    pub async fn purge_cancelled(&self, now: NaiveDateTime) -> Result<u64> {
        let cutoff = now - self.retention;
        let result = Appointment::delete_many()
            .filter(appointment::Column::Status.eq(AppointmentStatus::Cancelled))
            .filter(appointment::Column::UpdatedAt.lt(cutoff))
            .exec(&self.db)
            .await?;

        info!(deleted = result.rows_affected, %cutoff, "Purged cancelled appointments");
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use sea_orm::ConnectionTrait;

    use super::*;
    use crate::testing::{insert_user, setup_db};

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2030, 6, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    async fn insert(
        db: &DatabaseConnection,
        user_id: i32,
        doctor: &str,
        date: NaiveDateTime,
        status: AppointmentStatus,
        updated_at: NaiveDateTime,
    ) -> appointment::Model {
        appointment::ActiveModel {
            user_id: Set(user_id),
            patient_name: Set("Jane Roe".to_string()),
            patient_phone: Set(None),
            appointment_date: Set(date),
            doctor_name: Set(doctor.to_string()),
            department: Set(None),
            reason: Set(None),
            status: Set(status),
            notes: Set(None),
            created_at: Set(updated_at),
            updated_at: Set(updated_at),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_no_show_converts_only_past_active() {
        let db = setup_db().await;
        let user = insert_user(&db, "alice").await;
        let now = at(15, 12);
        let earlier = at(1, 0);

        let past_scheduled =
            insert(&db, user.id, "Dr. Lee", at(14, 9), AppointmentStatus::Scheduled, earlier).await;
        let past_confirmed =
            insert(&db, user.id, "Dr. Kim", at(14, 9), AppointmentStatus::Confirmed, earlier).await;
        let past_completed =
            insert(&db, user.id, "Dr. Lee", at(13, 9), AppointmentStatus::Completed, earlier).await;
        let future =
            insert(&db, user.id, "Dr. Lee", at(16, 9), AppointmentStatus::Scheduled, earlier).await;

        let jobs = CleanupJobs::new(db.clone(), Duration::days(DEFAULT_RETENTION_DAYS));
        let report = jobs.mark_past_as_no_show(now).await.unwrap();
        assert_eq!(
            report,
            NoShowReport {
                matched: 2,
                converted: 2,
                failed: 0
            }
        );

        let status_of = |id: i32| {
            let db = db.clone();
            async move {
                Appointment::find_by_id(id)
                    .one(&db)
                    .await
                    .unwrap()
                    .unwrap()
            }
        };
        let converted = status_of(past_scheduled.id).await;
        assert_eq!(converted.status, AppointmentStatus::NoShow);
        assert_eq!(converted.updated_at, now);
        assert_eq!(status_of(past_confirmed.id).await.status, AppointmentStatus::NoShow);
        assert_eq!(status_of(past_completed.id).await.status, AppointmentStatus::Completed);
        assert_eq!(status_of(future.id).await.status, AppointmentStatus::Scheduled);
    }

    #[tokio::test]
    async fn test_no_show_second_run_is_a_no_op() {
        let db = setup_db().await;
        let user = insert_user(&db, "alice").await;
        let now = at(15, 12);
        let record =
            insert(&db, user.id, "Dr. Lee", at(14, 9), AppointmentStatus::Scheduled, at(1, 0)).await;

        let jobs = CleanupJobs::new(db.clone(), Duration::days(DEFAULT_RETENTION_DAYS));
        jobs.mark_past_as_no_show(now).await.unwrap();
        let after_first = Appointment::find_by_id(record.id).one(&db).await.unwrap().unwrap();

        let later = at(16, 12);
        let second = jobs.mark_past_as_no_show(later).await.unwrap();
        assert_eq!(second, NoShowReport::default());

        let after_second = Appointment::find_by_id(record.id).one(&db).await.unwrap().unwrap();
        assert_eq!(after_first, after_second);
    }

    #[tokio::test]
    async fn test_no_show_failed_save_does_not_stop_the_sweep() {
        let db = setup_db().await;
        let user = insert_user(&db, "alice").await;
        let now = at(15, 12);
        let earlier = at(1, 0);

        let locked =
            insert(&db, user.id, "Dr. Lee", at(14, 9), AppointmentStatus::Scheduled, earlier).await;
        let open =
            insert(&db, user.id, "Dr. Kim", at(14, 10), AppointmentStatus::Scheduled, earlier).await;
        db.execute_unprepared(&format!(
            "CREATE TRIGGER lock_appointment BEFORE UPDATE ON appointments \
             WHEN OLD.id = {} BEGIN SELECT RAISE(ABORT, 'locked'); END",
            locked.id
        ))
        .await
        .unwrap();

        let jobs = CleanupJobs::new(db.clone(), Duration::days(DEFAULT_RETENTION_DAYS));
        let report = jobs.mark_past_as_no_show(now).await.unwrap();
        assert_eq!(
            report,
            NoShowReport {
                matched: 2,
                converted: 1,
                failed: 1
            }
        );

        let open_after = Appointment::find_by_id(open.id).one(&db).await.unwrap().unwrap();
        assert_eq!(open_after.status, AppointmentStatus::NoShow);
        let locked_after = Appointment::find_by_id(locked.id).one(&db).await.unwrap().unwrap();
        assert_eq!(locked_after, locked);
    }

    #[tokio::test]
    async fn test_purge_respects_retention_cutoff() {
        let db = setup_db().await;
        let user = insert_user(&db, "alice").await;
        let now = Utc::now().naive_utc();

        let old = insert(
            &db,
            user.id,
            "Dr. Lee",
            at(1, 9),
            AppointmentStatus::Cancelled,
            now - Duration::days(91),
        )
        .await;
        let recent = insert(
            &db,
            user.id,
            "Dr. Lee",
            at(2, 9),
            AppointmentStatus::Cancelled,
            now - Duration::days(89),
        )
        .await;
        let old_completed = insert(
            &db,
            user.id,
            "Dr. Lee",
            at(3, 9),
            AppointmentStatus::Completed,
            now - Duration::days(200),
        )
        .await;

        let jobs = CleanupJobs::new(db.clone(), Duration::days(DEFAULT_RETENTION_DAYS));
        assert_eq!(jobs.purge_cancelled(now).await.unwrap(), 1);

        assert!(Appointment::find_by_id(old.id).one(&db).await.unwrap().is_none());
        assert!(Appointment::find_by_id(recent.id).one(&db).await.unwrap().is_some());
        assert!(Appointment::find_by_id(old_completed.id).one(&db).await.unwrap().is_some());

        assert_eq!(jobs.purge_cancelled(now).await.unwrap(), 0);
    }
}
