use std::str::FromStr as _;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::Patient;

use super::entry::{fmt_dt, parse_dt};

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, first_name, last_name, date_of_birth, phone, email, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            patient.id.to_string(),
            patient.first_name,
            patient.last_name,
            patient.date_of_birth.map(|d| d.to_string()),
            patient.phone,
            patient.email,
            fmt_dt(&patient.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, first_name, last_name, date_of_birth, phone, email, created_at
             FROM patients WHERE id = ?1",
            params![id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, String>(6)?,
                ))
            },
        )
        .optional()?;

    row.map(patient_from_row).transpose()
}

/// Reference check used by the queue core before creating an entry.
pub fn patient_exists(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM patients WHERE id = ?1",
        params![id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn list_patients(conn: &Connection) -> Result<Vec<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, first_name, last_name, date_of_birth, phone, email, created_at
         FROM patients ORDER BY last_name ASC, first_name ASC",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, Option<String>>(4)?,
            row.get::<_, Option<String>>(5)?,
            row.get::<_, String>(6)?,
        ))
    })?;

    let mut patients = Vec::new();
    for row in rows {
        patients.push(patient_from_row(row?)?);
    }
    Ok(patients)
}

pub fn update_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE patients SET first_name = ?1, last_name = ?2, date_of_birth = ?3,
                phone = ?4, email = ?5
         WHERE id = ?6",
        params![
            patient.first_name,
            patient.last_name,
            patient.date_of_birth.map(|d| d.to_string()),
            patient.phone,
            patient.email,
            patient.id.to_string(),
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Patient".into(),
            id: patient.id.to_string(),
        });
    }
    Ok(())
}

/// Delete a patient record. Refused while queue entries still reference it
/// (FK constraint), surfaced as a constraint violation.
pub fn delete_patient(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let result = conn.execute("DELETE FROM patients WHERE id = ?1", params![id.to_string()]);
    match result {
        Ok(0) => Err(DatabaseError::NotFound {
            entity_type: "Patient".into(),
            id: id.to_string(),
        }),
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(e, msg))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(DatabaseError::ConstraintViolation(
                msg.unwrap_or_else(|| "patient still has queue entries".into()),
            ))
        }
        Err(e) => Err(e.into()),
    }
}

type PatientRow = (
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
);

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    let (id, first_name, last_name, dob, phone, email, created_at) = row;
    Ok(Patient {
        id: Uuid::from_str(&id).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        first_name,
        last_name,
        date_of_birth: dob.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        phone,
        email,
        created_at: parse_dt(&created_at)?,
    })
}
