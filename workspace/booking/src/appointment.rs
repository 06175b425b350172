use chrono::{NaiveDateTime, Utc};
use model::entities::{appointment, prelude::*};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{BookingError, Result, is_unique_violation};

const PAST_DATE: &str = "Appointment date must be in the future";
const SLOT_TAKEN: &str = "This time slot is already booked for the selected doctor";
const USER_NOT_FOUND: &str = "User not found";
const APPOINTMENT_NOT_FOUND: &str = "Appointment not found";

/// Booking request for a new appointment.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub user_id: i32,
    pub patient_name: String,
    pub patient_phone: Option<String>,
    pub appointment_date: NaiveDateTime,
    pub doctor_name: String,
    pub department: Option<String>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

/// Partial update of an appointment. `Some` overwrites, `None` keeps.
#[derive(Debug, Clone, Default)]
pub struct AppointmentPatch {
    pub patient_name: Option<String>,
    pub patient_phone: Option<String>,
    pub appointment_date: Option<NaiveDateTime>,
    pub doctor_name: Option<String>,
    pub department: Option<String>,
    pub reason: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
}

impl AppointmentPatch {
    pub fn apply(self, target: &mut appointment::ActiveModel) {
        if let Some(v) = self.patient_name {
            target.patient_name = Set(v);
        }
        if let Some(v) = self.patient_phone {
            target.patient_phone = Set(Some(v));
        }
        if let Some(v) = self.appointment_date {
            target.appointment_date = Set(v);
        }
        if let Some(v) = self.doctor_name {
            target.doctor_name = Set(v);
        }
        if let Some(v) = self.department {
            target.department = Set(Some(v));
        }
        if let Some(v) = self.reason {
            target.reason = Set(Some(v));
        }
        if let Some(v) = self.status {
            target.status = Set(v);
        }
        if let Some(v) = self.notes {
            target.notes = Set(Some(v));
        }
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn ensure_future(date: NaiveDateTime) -> Result<()> {
    if date > now() {
        Ok(())
    } else {
        Err(BookingError::Validation(PAST_DATE.to_string()))
    }
}

/// Maps a write failure, treating an active-slot index hit as a booking
/// conflict.
fn write_error(err: sea_orm::DbErr) -> BookingError {
    if is_unique_violation(&err) {
        BookingError::Conflict(SLOT_TAKEN.to_string())
    } else {
        BookingError::from(err)
    }
}

#[derive(Debug, Clone)]
pub struct AppointmentService {
    db: DatabaseConnection,
}

impl AppointmentService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Books a new appointment in `SCHEDULED` state.
    ///
    /// Checks run in order: the date must be in the future, the doctor must
    /// be free at that exact time, the user must exist.
    #[instrument(skip(self, request), fields(user_id = request.user_id, doctor = %request.doctor_name))]
    pub async fn create(&self, request: NewAppointment) -> Result<appointment::Model> {
        ensure_future(request.appointment_date)?;

        let conflicts = self
            .find_conflicts(&request.doctor_name, request.appointment_date)
            .await?;
        if !conflicts.is_empty() {
            warn!(existing = conflicts.len(), "Doctor already booked at requested time");
            return Err(BookingError::Conflict(SLOT_TAKEN.to_string()));
        }

        if User::find_by_id(request.user_id).one(&self.db).await?.is_none() {
            warn!("Booking for unknown user");
            return Err(BookingError::NotFound(USER_NOT_FOUND.to_string()));
        }

        let stamp = now();
        let created = appointment::ActiveModel {
            user_id: Set(request.user_id),
            patient_name: Set(request.patient_name),
            patient_phone: Set(request.patient_phone),
            appointment_date: Set(request.appointment_date),
            doctor_name: Set(request.doctor_name),
            department: Set(request.department),
            reason: Set(request.reason),
            status: Set(AppointmentStatus::Scheduled),
            notes: Set(request.notes),
            created_at: Set(stamp),
            updated_at: Set(stamp),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(write_error)?;

        info!(appointment_id = created.id, "Appointment created");
        Ok(created)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<appointment::Model>> {
        Ok(Appointment::find_by_id(id).one(&self.db).await?)
    }

    pub async fn list(&self) -> Result<Vec<appointment::Model>> {
        Ok(Appointment::find()
            .order_by_asc(appointment::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Appointments booked by a user, latest first.
    #[instrument(skip(self))]
    pub async fn list_by_user(&self, user_id: i32) -> Result<Vec<appointment::Model>> {
        let owner = User::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| BookingError::NotFound(USER_NOT_FOUND.to_string()))?;

        let appointments = owner
            .find_related(Appointment)
            .order_by_desc(appointment::Column::AppointmentDate)
            .all(&self.db)
            .await?;
        debug!(count = appointments.len(), "Loaded appointments for user");
        Ok(appointments)
    }

    pub async fn list_by_status(
        &self,
        status: AppointmentStatus,
    ) -> Result<Vec<appointment::Model>> {
        Ok(Appointment::find()
            .filter(appointment::Column::Status.eq(status))
            .order_by_asc(appointment::Column::AppointmentDate)
            .all(&self.db)
            .await?)
    }

    /// Appointments in `status` whose date lies within `[start, end]`.
    pub async fn list_in_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
        status: AppointmentStatus,
    ) -> Result<Vec<appointment::Model>> {
        Ok(Appointment::find()
            .filter(appointment::Column::AppointmentDate.between(start, end))
            .filter(appointment::Column::Status.eq(status))
            .order_by_asc(appointment::Column::AppointmentDate)
            .all(&self.db)
            .await?)
    }

    /// Active appointments holding `doctor_name` at exactly `date`.
    pub async fn find_conflicts(
        &self,
        doctor_name: &str,
        date: NaiveDateTime,
    ) -> Result<Vec<appointment::Model>> {
        trace!(doctor_name, %date, "Looking up conflicting appointments");
        Ok(Appointment::find()
            .filter(appointment::Column::DoctorName.eq(doctor_name))
            .filter(appointment::Column::AppointmentDate.eq(date))
            .filter(appointment::Column::Status.is_in(AppointmentStatus::ACTIVE))
            .all(&self.db)
            .await?)
    }

    /// Applies a partial update. Moving an appointment onto an occupied slot
    /// is only caught by the active-slot index.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: i32, patch: AppointmentPatch) -> Result<appointment::Model> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| BookingError::NotFound(APPOINTMENT_NOT_FOUND.to_string()))?;

        if let Some(date) = patch.appointment_date {
            ensure_future(date)?;
        }

        let mut active: appointment::ActiveModel = existing.into();
        patch.apply(&mut active);
        active.updated_at = Set(now());

        let updated = active.update(&self.db).await.map_err(write_error)?;
        info!(appointment_id = updated.id, status = ?updated.status, "Appointment updated");
        Ok(updated)
    }

    /// Marks an appointment `CANCELLED` whatever its current status.
    #[instrument(skip(self))]
    pub async fn cancel(&self, id: i32) -> Result<appointment::Model> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| BookingError::NotFound(APPOINTMENT_NOT_FOUND.to_string()))?;
        debug!(previous = ?existing.status, "Cancelling appointment");

        let mut active: appointment::ActiveModel = existing.into();
        active.status = Set(AppointmentStatus::Cancelled);
        active.updated_at = Set(now());

        let cancelled = active.update(&self.db).await?;
        info!(appointment_id = id, "Appointment cancelled");
        Ok(cancelled)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<()> {
        let result = Appointment::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(BookingError::NotFound(APPOINTMENT_NOT_FOUND.to_string()));
        }
        info!(appointment_id = id, "Appointment deleted");
        Ok(())
    }
}
