//! Fake business records for the create endpoints.
//!
//! Drafts are assembled from fixed word lists so every field is non-empty and plausible: people
//! are adults, projects end after they start, and money is positive with two decimal places.

use chrono::{NaiveDate, TimeDelta, Utc};
use rand::Rng;
use rust_decimal::Decimal;

use crate::db::models::records::{CommercialCustomerDraft, CompetitorDraft, EmployeeDraft, PersonalCustomerDraft, ProjectDraft};

/// Something that can be filled with realistic random values.
pub trait Generate: Sized {
    fn generate<R: Rng>(rng: &mut R) -> Self;
}

const FIRST_NAMES: &[&str] = &[
    "James", "Mary", "Robert", "Patricia", "John", "Jennifer", "Michael", "Linda", "David", "Elizabeth", "William", "Barbara",
    "Richard", "Susan", "Joseph", "Jessica", "Thomas", "Sarah", "Carlos", "Karen", "Daniel", "Lisa", "Matthew", "Nancy", "Anthony",
    "Sandra", "Mark", "Ashley", "Priya", "Kimberly", "Wei", "Emily", "Andrew", "Donna", "Olusegun", "Michelle",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez", "Martinez", "Hernandez", "Lopez",
    "Gonzalez", "Wilson", "Anderson", "Thomas", "Taylor", "Moore", "Jackson", "Martin", "Lee", "Perez", "Thompson", "White",
    "Harris", "Sanchez", "Clark", "Ramirez", "Lewis", "Robinson", "Okafor", "Patel", "Nguyen", "Kowalski",
];

const STREET_NAMES: &[&str] = &[
    "Main", "Oak", "Pine", "Maple", "Cedar", "Elm", "Washington", "Lake", "Hill", "Park", "Sunset", "Highland", "River", "Church",
    "Mill", "Spring", "Franklin", "Jefferson", "Meadow", "Forest",
];

const STREET_SUFFIXES: &[&str] = &["Street", "Avenue", "Road", "Boulevard", "Lane", "Drive", "Court", "Way", "Place"];

const CITIES: &[&str] = &[
    "Springfield", "Riverside", "Franklin", "Greenville", "Bristol", "Clinton", "Fairview", "Salem", "Madison", "Georgetown",
    "Arlington", "Ashland", "Burlington", "Manchester", "Oxford", "Dover", "Hudson", "Kingston", "Milton", "Newport",
];

const STATES: &[&str] = &[
    "California", "Texas", "New York", "Florida", "Illinois", "Ohio", "Georgia", "Washington", "Oregon", "Colorado", "Arizona",
    "Massachusetts", "Virginia", "Michigan", "Minnesota", "Nevada",
];

const COUNTRIES: &[&str] = &[
    "United States", "Canada", "United Kingdom", "Germany", "France", "Australia", "Netherlands", "Ireland", "Spain", "Japan",
    "Brazil", "India", "Sweden", "Singapore",
];

const COMPANY_STEMS: &[&str] = &[
    "Acme", "Globex", "Initech", "Umbrella", "Stark", "Wayne", "Wonka", "Hooli", "Vandelay", "Soylent", "Cyberdyne", "Tyrell",
    "Aperture", "Gringotts", "Oceanic", "Massive Dynamic", "Pied Piper", "Dunder Mifflin", "Blue Sun", "Monarch",
];

const COMPANY_SUFFIXES: &[&str] = &["Inc", "LLC", "Group", "Holdings", "Ltd", "Partners", "Corporation", "Solutions", "Industries"];

const JOB_TITLES: &[&str] = &[
    "Chief Executive Officer", "Chief Financial Officer", "Operations Manager", "Purchasing Manager", "Sales Director",
    "Account Executive", "Project Manager", "Software Engineer", "Data Analyst", "Marketing Specialist", "HR Generalist",
    "Office Administrator", "Product Owner", "Financial Controller", "Customer Success Manager", "Procurement Lead",
];

const OCCUPATIONS: &[&str] = &[
    "Teacher", "Nurse", "Electrician", "Accountant", "Architect", "Pharmacist", "Graphic Designer", "Chef", "Lawyer", "Dentist",
    "Journalist", "Mechanic", "Photographer", "Physiotherapist", "Librarian", "Civil Engineer", "Veterinarian", "Pilot",
];

const DEPARTMENTS: &[&str] = &[
    "Engineering", "Sales", "Marketing", "Finance", "Human Resources", "Operations", "Customer Support", "Legal", "Research",
    "Product", "Procurement",
];

const INDUSTRIES: &[&str] = &[
    "Software", "Manufacturing", "Retail", "Healthcare", "Logistics", "Financial Services", "Telecommunications", "Energy",
    "Construction", "Hospitality", "Education", "Media", "Agriculture", "Biotechnology",
];

const BUSINESS_TYPES: &[&str] = &[
    "Corporation", "Limited Liability Company", "Partnership", "Sole Proprietorship", "Cooperative", "Nonprofit",
];

const GENDERS: &[&str] = &["Female", "Male", "Non-binary"];

const PROJECT_ADJECTIVES: &[&str] = &[
    "Phoenix", "Atlas", "Orion", "Horizon", "Aurora", "Summit", "Nimbus", "Meridian", "Keystone", "Vanguard", "Catalyst", "Beacon",
];

const PROJECT_KINDS: &[&str] = &[
    "Platform Migration", "Website Redesign", "CRM Rollout", "Data Warehouse", "Mobile App", "Supply Chain Audit",
    "Office Relocation", "Security Review", "Analytics Dashboard", "ERP Integration",
];

const PROJECT_DESCRIPTIONS: &[&str] = &[
    "Replace the legacy system with a maintainable service and migrate existing data.",
    "Deliver a customer-facing portal with self-service account management.",
    "Consolidate reporting from regional offices into a single weekly view.",
    "Automate invoice processing and reduce manual data entry.",
    "Assess current infrastructure and produce a modernization roadmap.",
    "Roll out new tooling to the sales team and train regional leads.",
    "Harden access controls and document incident response procedures.",
];

const PROJECT_STATUSES: &[&str] = &["Planned", "In Progress", "On Hold", "Completed", "Cancelled"];

const DOMAINS: &[&str] = &["example.com", "example.org", "example.net", "mail.example.com", "corp.example.com"];

fn pick<R: Rng>(rng: &mut R, values: &'static [&'static str]) -> &'static str {
    values[rng.random_range(0..values.len())]
}

fn owned<R: Rng>(rng: &mut R, values: &'static [&'static str]) -> String {
    pick(rng, values).to_string()
}

fn slug(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn person_email<R: Rng>(rng: &mut R, first: &str, last: &str) -> String {
    format!("{}.{}@{}", slug(first), slug(last), pick(rng, DOMAINS))
}

fn company_name<R: Rng>(rng: &mut R) -> String {
    format!("{} {}", pick(rng, COMPANY_STEMS), pick(rng, COMPANY_SUFFIXES))
}

fn company_email<R: Rng>(rng: &mut R, company: &str) -> String {
    let mailbox = pick(rng, &["info", "contact", "sales", "hello", "office"]);
    format!("{mailbox}@{}.example.com", slug(company))
}

fn website(company: &str) -> String {
    format!("https://www.{}.example.com", slug(company))
}

fn phone_number<R: Rng>(rng: &mut R) -> String {
    format!(
        "+1-{}-{}-{:04}",
        rng.random_range(201..=989),
        rng.random_range(200..=999),
        rng.random_range(0..=9999)
    )
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// A date between `min_days` and `max_days` before today.
fn days_ago<R: Rng>(rng: &mut R, min_days: i64, max_days: i64) -> NaiveDate {
    today() - TimeDelta::days(rng.random_range(min_days..=max_days))
}

/// A date of birth for someone aged 18 to 70.
fn birth_date<R: Rng>(rng: &mut R) -> NaiveDate {
    days_ago(rng, 18 * 365 + 5, 70 * 365)
}

/// A positive amount with two decimal places, between `min` and `max` whole units.
fn money<R: Rng>(rng: &mut R, min: i64, max: i64) -> Decimal {
    Decimal::new(rng.random_range(min * 100..=max * 100), 2)
}

struct Address {
    street: String,
    city: String,
    state: String,
    zip_code: String,
    country: String,
}

impl Address {
    fn generate<R: Rng>(rng: &mut R) -> Self {
        Self {
            street: format!(
                "{} {} {}",
                rng.random_range(1..=9999),
                pick(rng, STREET_NAMES),
                pick(rng, STREET_SUFFIXES)
            ),
            city: owned(rng, CITIES),
            state: owned(rng, STATES),
            zip_code: format!("{:05}", rng.random_range(10000..=99999)),
            country: owned(rng, COUNTRIES),
        }
    }
}

impl Generate for CommercialCustomerDraft {
    fn generate<R: Rng>(rng: &mut R) -> Self {
        let company_name = company_name(rng);
        let address = Address::generate(rng);
        Self {
            contact_person_first_name: owned(rng, FIRST_NAMES),
            contact_person_last_name: owned(rng, LAST_NAMES),
            contact_person_position: owned(rng, JOB_TITLES),
            address_street: address.street,
            address_city: address.city,
            address_state: address.state,
            address_zip_code: address.zip_code,
            address_country: address.country,
            phone_number: phone_number(rng),
            email: company_email(rng, &company_name),
            website: website(&company_name),
            tax_id: format!("{:02}-{:07}", rng.random_range(10..=99), rng.random_range(0..=9_999_999)),
            business_type: owned(rng, BUSINESS_TYPES),
            company_name,
        }
    }
}

impl Generate for PersonalCustomerDraft {
    fn generate<R: Rng>(rng: &mut R) -> Self {
        let first_name = owned(rng, FIRST_NAMES);
        let last_name = owned(rng, LAST_NAMES);
        let address = Address::generate(rng);
        Self {
            address_street: address.street,
            address_city: address.city,
            address_state: address.state,
            address_zip_code: address.zip_code,
            address_country: address.country,
            phone_number: phone_number(rng),
            email: person_email(rng, &first_name, &last_name),
            date_of_birth: birth_date(rng),
            gender: owned(rng, GENDERS),
            occupation: owned(rng, OCCUPATIONS),
            first_name,
            last_name,
        }
    }
}

impl Generate for ProjectDraft {
    fn generate<R: Rng>(rng: &mut R) -> Self {
        let start_date = days_ago(rng, -180, 2 * 365);
        let end_date = start_date + TimeDelta::days(rng.random_range(14..=540));
        let client_company_name = company_name(rng);
        let contact_first = owned(rng, FIRST_NAMES);
        let contact_last = owned(rng, LAST_NAMES);
        Self {
            project_name: format!("{} {}", pick(rng, PROJECT_ADJECTIVES), pick(rng, PROJECT_KINDS)),
            description: owned(rng, PROJECT_DESCRIPTIONS),
            start_date,
            end_date,
            budget: money(rng, 5_000, 2_000_000),
            client_contact_person_position: owned(rng, JOB_TITLES),
            client_phone_number: phone_number(rng),
            client_email: person_email(rng, &contact_first, &contact_last),
            client_contact_person_first_name: contact_first,
            client_contact_person_last_name: contact_last,
            client_company_name,
            status: owned(rng, PROJECT_STATUSES),
        }
    }
}

impl Generate for EmployeeDraft {
    fn generate<R: Rng>(rng: &mut R) -> Self {
        let first_name = owned(rng, FIRST_NAMES);
        let last_name = owned(rng, LAST_NAMES);
        let address = Address::generate(rng);
        let date_of_birth = birth_date(rng);
        // Hired no earlier than their 18th birthday
        let employable_days = (today() - date_of_birth).num_days() - 18 * 365;
        Self {
            address_street: address.street,
            address_city: address.city,
            address_state: address.state,
            address_zip_code: address.zip_code,
            address_country: address.country,
            phone_number: phone_number(rng),
            email: person_email(rng, &first_name, &last_name),
            date_of_birth,
            gender: owned(rng, GENDERS),
            position: owned(rng, JOB_TITLES),
            department: owned(rng, DEPARTMENTS),
            salary: money(rng, 28_000, 240_000),
            date_hired: days_ago(rng, 0, employable_days.clamp(0, 25 * 365)),
            first_name,
            last_name,
        }
    }
}

impl Generate for CompetitorDraft {
    fn generate<R: Rng>(rng: &mut R) -> Self {
        let company_name = company_name(rng);
        let address = Address::generate(rng);
        Self {
            address_street: address.street,
            address_city: address.city,
            address_state: address.state,
            address_zip_code: address.zip_code,
            address_country: address.country,
            phone_number: phone_number(rng),
            email: company_email(rng, &company_name),
            website: website(&company_name),
            industry: owned(rng, INDUSTRIES),
            number_of_employees: rng.random_range(5..=250_000),
            annual_revenue: money(rng, 250_000, 5_000_000_000),
            company_name,
        }
    }
}
