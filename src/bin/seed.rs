//! Seeds the database with sample employees and users.
//! Run with: cargo run --bin seed

use anyhow::{Context, Result};
use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
};
use dotenvy::dotenv;
use sqlx::MySqlPool;
use std::env;

const FIRST_NAMES: &[&str] = &[
    "John", "Jane", "Michael", "Sarah", "David", "Emily", "Robert", "Jessica", "William", "Ashley",
    "James", "Amanda", "Christopher", "Melissa", "Daniel", "Nicole", "Matthew", "Michelle",
    "Anthony", "Kimberly", "Mark", "Amy", "Donald", "Angela", "Steven", "Lisa", "Paul", "Nancy",
    "Andrew", "Karen", "Joshua", "Betty", "Kenneth", "Helen", "Kevin", "Sandra", "Brian", "Donna",
    "George", "Carol", "Edward", "Ruth", "Ronald", "Sharon", "Timothy", "Laura", "Jason", "Emma",
    "Jeffrey", "Olivia",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Wilson", "Anderson", "Thomas", "Taylor", "Moore", "Jackson",
    "Martin", "Lee", "Thompson", "White", "Harris", "Sanchez", "Clark", "Ramirez", "Lewis",
    "Robinson", "Walker", "Young", "Allen", "King", "Wright", "Scott", "Torres", "Nguyen", "Hill",
    "Flores", "Green", "Adams", "Nelson", "Baker", "Hall", "Rivera", "Campbell", "Mitchell",
    "Carter", "Roberts", "Gomez", "Phillips",
];

const DEPARTMENTS: &[&str] = &[
    "Engineering",
    "Human Resources",
    "Finance",
    "Marketing",
    "Sales",
    "Operations",
];

fn is_duplicate(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23000"))
}

async fn add_employees(pool: &MySqlPool) -> Result<()> {
    let mut inserted = 0;
    for i in 0..50 {
        let employee_id = format!("EMP{:03}", i + 1);
        let first = FIRST_NAMES[i % FIRST_NAMES.len()];
        let last = LAST_NAMES[i % LAST_NAMES.len()];
        let full_name = format!("{first} {last}");
        let email = format!("{}.{}{}@example.com", first, last, i + 1).to_lowercase();
        let department = DEPARTMENTS[i % DEPARTMENTS.len()];

        let result = sqlx::query(
            r#"
            INSERT INTO employees (employee_id, full_name, email, department)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&employee_id)
        .bind(&full_name)
        .bind(&email)
        .bind(department)
        .execute(pool)
        .await;

        match result {
            Ok(_) => inserted += 1,
            Err(e) if is_duplicate(&e) => {
                println!("Skipping {employee_id}: already exists");
            }
            Err(e) => return Err(e).context(format!("inserting employee {employee_id}")),
        }
    }
    println!("Inserted {inserted} employees");
    Ok(())
}

async fn add_users(pool: &MySqlPool) -> Result<()> {
    let argon2 = Argon2::default();
    let mut inserted = 0;
    for i in 0..50 {
        let first = FIRST_NAMES[i % FIRST_NAMES.len()];
        let last = LAST_NAMES[i % LAST_NAMES.len()];
        let full_name = format!("{first} {last}");
        let email = format!("{}.{}{}@company.com", first, last, i + 1).to_lowercase();

        let salt = SaltString::generate(&mut OsRng);
        let hashed = argon2
            .hash_password(b"password123", &salt)
            .map_err(|e| anyhow::anyhow!("hashing password: {e}"))?
            .to_string();

        let result = sqlx::query(
            r#"
            INSERT INTO users (email, password, full_name)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&email)
        .bind(&hashed)
        .bind(&full_name)
        .execute(pool)
        .await;

        match result {
            Ok(_) => inserted += 1,
            Err(e) if is_duplicate(&e) => {
                println!("Skipping {email}: already exists");
            }
            Err(e) => return Err(e).context(format!("inserting user {email}")),
        }
    }
    println!("Inserted {inserted} users (password: password123)");
    Ok(())
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = MySqlPool::connect(&database_url)
        .await
        .context("connecting to MySQL")?;

    add_employees(&pool).await?;
    add_users(&pool).await?;

    Ok(())
}
