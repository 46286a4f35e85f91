//! Database models for the business records: customers, projects, employees and competitors.
//!
//! Each resource comes as a pair: the stored record (with its `id`) and a draft holding every
//! other column. Drafts are what gets generated, inserted and merged into on update.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sqlx::{FromRow, Postgres, postgres::PgArguments, postgres::PgRow, query::QueryAs};
use utoipa::ToSchema;

use crate::{sample_data::Generate, types::RecordId};

/// A query returning rows of `R`, ready for more binds.
pub type RecordQuery<'q, R> = QueryAs<'q, Postgres, R, PgArguments>;

/// A business-record table and how to move its rows in and out of Postgres.
pub trait BusinessRecord: for<'r> FromRow<'r, PgRow> + Serialize + ToSchema + Send + Sync + Unpin + 'static {
    /// Every column except `id`, in [`COLUMNS`](Self::COLUMNS) order
    type Draft: Serialize + DeserializeOwned + Generate + Clone + Send + Sync;

    /// Table name
    const TABLE: &'static str;
    /// Path segment under `/api/v1`
    const RESOURCE: &'static str;
    /// Human name used in messages, e.g. "Employee not found"
    const LABEL: &'static str;
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> RecordId;

    fn into_draft(self) -> Self::Draft;

    /// Bind every draft column, in [`COLUMNS`](Self::COLUMNS) order.
    fn bind_draft<'q>(query: RecordQuery<'q, Self>, draft: &Self::Draft) -> RecordQuery<'q, Self>;

    /// Check that every draft value fits its column. The error names the offending field.
    fn validate_draft(draft: &Self::Draft) -> Result<(), String>;
}

/// A draft field value that may be out of range for its column.
pub trait ColumnValue {
    fn check(&self) -> Result<(), String> {
        Ok(())
    }
}

impl ColumnValue for String {}
impl ColumnValue for NaiveDate {}
impl ColumnValue for i32 {}

/// Money columns are `NUMERIC(14, 2)`: at most two decimal places and twelve integer digits.
impl ColumnValue for Decimal {
    fn check(&self) -> Result<(), String> {
        if self.normalize().scale() > 2 {
            return Err(format!("{self} has more than 2 decimal places"));
        }
        if self.abs() >= Decimal::new(1_000_000_000_000, 0) {
            return Err(format!("{self} is out of range"));
        }
        Ok(())
    }
}

macro_rules! business_record {
    (
        $(#[$meta:meta])*
        $record:ident, $draft:ident {
            table: $table:literal,
            resource: $resource:literal,
            label: $label:literal,
        }
        { $( $(#[$fmeta:meta])* $field:ident: $ty:ty ),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
        pub struct $record {
            pub id: RecordId,
            $( $(#[$fmeta])* pub $field: $ty, )+
        }

        #[doc = concat!("A [`", stringify!($record), "`] without its id.")]
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
        pub struct $draft {
            $( $(#[$fmeta])* pub $field: $ty, )+
        }

        impl BusinessRecord for $record {
            type Draft = $draft;

            const TABLE: &'static str = $table;
            const RESOURCE: &'static str = $resource;
            const LABEL: &'static str = $label;
            const COLUMNS: &'static [&'static str] = &[$(stringify!($field)),+];

            fn id(&self) -> RecordId {
                self.id
            }

            fn into_draft(self) -> $draft {
                $draft { $( $field: self.$field, )+ }
            }

            fn bind_draft<'q>(query: RecordQuery<'q, Self>, draft: &$draft) -> RecordQuery<'q, Self> {
                query $( .bind(draft.$field.clone()) )+
            }

            fn validate_draft(draft: &$draft) -> Result<(), String> {
                $( ColumnValue::check(&draft.$field).map_err(|e| format!("{}: {e}", stringify!($field)))?; )+
                Ok(())
            }
        }
    };
}

business_record! {
    /// A company the business sells to.
    CommercialCustomer, CommercialCustomerDraft {
        table: "commercial_customers",
        resource: "commercial-customers",
        label: "Commercial Customer",
    }
    {
        company_name: String,
        contact_person_first_name: String,
        contact_person_last_name: String,
        contact_person_position: String,
        address_street: String,
        address_city: String,
        address_state: String,
        address_zip_code: String,
        address_country: String,
        phone_number: String,
        email: String,
        website: String,
        tax_id: String,
        business_type: String,
    }
}

business_record! {
    /// A private individual the business sells to.
    PersonalCustomer, PersonalCustomerDraft {
        table: "personal_customers",
        resource: "personal-customers",
        label: "Personal Customer",
    }
    {
        first_name: String,
        last_name: String,
        address_street: String,
        address_city: String,
        address_state: String,
        address_zip_code: String,
        address_country: String,
        phone_number: String,
        email: String,
        #[schema(value_type = String, format = Date)]
        date_of_birth: NaiveDate,
        gender: String,
        occupation: String,
    }
}

business_record! {
    Project, ProjectDraft {
        table: "projects",
        resource: "projects",
        label: "Project",
    }
    {
        project_name: String,
        description: String,
        #[schema(value_type = String, format = Date)]
        start_date: NaiveDate,
        #[schema(value_type = String, format = Date)]
        end_date: NaiveDate,
        #[schema(value_type = String, example = "125000.00")]
        budget: Decimal,
        client_company_name: String,
        client_contact_person_first_name: String,
        client_contact_person_last_name: String,
        client_contact_person_position: String,
        client_phone_number: String,
        client_email: String,
        status: String,
    }
}

business_record! {
    Employee, EmployeeDraft {
        table: "employees",
        resource: "employees",
        label: "Employee",
    }
    {
        first_name: String,
        last_name: String,
        address_street: String,
        address_city: String,
        address_state: String,
        address_zip_code: String,
        address_country: String,
        phone_number: String,
        email: String,
        #[schema(value_type = String, format = Date)]
        date_of_birth: NaiveDate,
        gender: String,
        position: String,
        department: String,
        #[schema(value_type = String, example = "68500.00")]
        salary: Decimal,
        #[schema(value_type = String, format = Date)]
        date_hired: NaiveDate,
    }
}

business_record! {
    Competitor, CompetitorDraft {
        table: "competitors",
        resource: "competitors",
        label: "Competitor",
    }
    {
        company_name: String,
        address_street: String,
        address_city: String,
        address_state: String,
        address_zip_code: String,
        address_country: String,
        phone_number: String,
        email: String,
        website: String,
        industry: String,
        number_of_employees: i32,
        #[schema(value_type = String, example = "4200000.00")]
        annual_revenue: Decimal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::FromStr;

    #[test]
    fn test_columns_match_serialized_fields() {
        fn check<R: BusinessRecord>() {
            let draft = <R::Draft as Generate>::generate(&mut rand::rng());
            let value = serde_json::to_value(&draft).unwrap();
            let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();

            assert_eq!(keys.len(), R::COLUMNS.len(), "{}", R::TABLE);
            for column in R::COLUMNS {
                assert!(keys.contains(column), "{} lacks {column}", R::TABLE);
            }
            assert!(!R::COLUMNS.contains(&"id"));
        }

        check::<CommercialCustomer>();
        check::<PersonalCustomer>();
        check::<Project>();
        check::<Employee>();
        check::<Competitor>();
    }

    #[test]
    fn test_money_serializes_as_string() {
        let mut draft = CompetitorDraft::generate(&mut rand::rng());
        draft.annual_revenue = Decimal::from_str("1234.50").unwrap();

        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(value["annual_revenue"], "1234.50");
    }

    #[test]
    fn test_money_must_fit_its_column() {
        let money = |s: &str| Decimal::from_str(s).unwrap();

        assert!(money("999999999999.99").check().is_ok());
        assert!(money("-12.50").check().is_ok());
        assert!(money("12.5000").check().is_ok());
        assert!(money("1000000000000").check().is_err());
        assert!(money("-1000000000000").check().is_err());
        assert!(money("12.345").check().is_err());
    }

    #[test]
    fn test_validate_draft_names_the_field() {
        let mut draft = EmployeeDraft::generate(&mut rand::rng());
        assert_eq!(Employee::validate_draft(&draft), Ok(()));

        draft.salary = Decimal::from_str("10000000000000").unwrap();
        let err = Employee::validate_draft(&draft).unwrap_err();
        assert!(err.starts_with("salary: "), "{err}");
    }

    #[test]
    fn test_into_draft_keeps_every_field() {
        let draft = EmployeeDraft::generate(&mut rand::rng());
        let record = Employee {
            id: 7,
            first_name: draft.first_name.clone(),
            last_name: draft.last_name.clone(),
            address_street: draft.address_street.clone(),
            address_city: draft.address_city.clone(),
            address_state: draft.address_state.clone(),
            address_zip_code: draft.address_zip_code.clone(),
            address_country: draft.address_country.clone(),
            phone_number: draft.phone_number.clone(),
            email: draft.email.clone(),
            date_of_birth: draft.date_of_birth,
            gender: draft.gender.clone(),
            position: draft.position.clone(),
            department: draft.department.clone(),
            salary: draft.salary,
            date_hired: draft.date_hired,
        };

        assert_eq!(record.id(), 7);
        assert_eq!(record.into_draft(), draft);
    }
}
