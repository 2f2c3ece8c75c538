use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::*;

pub fn insert_service(conn: &Connection, service: &Service) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO services (id, name, service_type) VALUES (?1, ?2, ?3)",
        params![service.id, service.name, service.service_type],
    )?;
    Ok(())
}

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, full_name, date_of_birth) VALUES (?1, ?2, ?3)",
        params![
            patient.id,
            patient.full_name,
            patient.date_of_birth.map(|d| d.to_string()),
        ],
    )?;
    Ok(())
}

pub fn insert_intake(conn: &Connection, intake: &Intake) -> Result<(), DatabaseError> {
    let answers = serde_json::to_string(&intake.answers).map_err(|e| DatabaseError::Json {
        field: "answers".into(),
        reason: e.to_string(),
    })?;
    conn.execute(
        "INSERT INTO intakes (id, service_id, patient_id, answers, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            intake.id,
            intake.service.id,
            intake.patient_id,
            answers,
            intake.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    )?;
    Ok(())
}

/// Load an intake with its service and patient. `NotFound` if the intake id is unknown.
pub fn get_intake_record(conn: &Connection, intake_id: &str) -> Result<IntakeRecord, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT i.id, i.patient_id, i.answers, i.created_at,
                    s.id, s.name, s.service_type,
                    p.full_name, p.date_of_birth
             FROM intakes i
             JOIN services s ON s.id = i.service_id
             JOIN patients p ON p.id = i.patient_id
             WHERE i.id = ?1",
            params![intake_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, Option<String>>(8)?,
                ))
            },
        )
        .optional()?
        .ok_or_else(|| DatabaseError::NotFound {
            entity_type: "intake".into(),
            id: intake_id.to_string(),
        })?;

    let (id, patient_id, answers, created_at, service_id, service_name, service_type, full_name, dob) = row;

    let answers: serde_json::Value = serde_json::from_str(&answers).map_err(|e| DatabaseError::Json {
        field: "answers".into(),
        reason: e.to_string(),
    })?;
    let created_at = parse_timestamp(&created_at).ok_or_else(|| DatabaseError::Json {
        field: "created_at".into(),
        reason: format!("unrecognised timestamp '{created_at}'"),
    })?;

    Ok(IntakeRecord {
        intake: Intake {
            id,
            service: Service {
                id: service_id,
                name: service_name,
                service_type,
            },
            patient_id: patient_id.clone(),
            answers: IntakeAnswers::from_value(answers),
            created_at,
        },
        patient: Patient {
            id: patient_id,
            full_name,
            date_of_birth: dob.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        },
    })
}

/// Accepts `YYYY-MM-DD HH:MM:SS`, the `T`-separated form, and an optional `Z` or fraction.
pub(crate) fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim().trim_end_matches('Z');
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
