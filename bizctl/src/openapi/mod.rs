//! OpenAPI documentation, served as JSON at `/api/v1/openapi.json` and rendered at `/api/docs`.
//!
//! The authentication routes live at the root; everything else is nested under `/api/v1`.
//! Record endpoints are generic handlers, so their operations are generated per record type by
//! [`RecordPathsAddon`] instead of being annotated.

use utoipa::{
    Modify, OpenApi, ToSchema,
    openapi::{
        Array, ContentBuilder, KnownFormat, ObjectBuilder, Ref, RefOr, Required, Schema, SchemaFormat, Type,
        path::{Operation, OperationBuilder, ParameterBuilder, ParameterIn, PathItem},
        request_body::RequestBodyBuilder,
        response::ResponseBuilder,
        security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityRequirement, SecurityScheme},
    },
};

use crate::{
    api,
    db::models::records::{BusinessRecord, CommercialCustomer, Competitor, Employee, PersonalCustomer, Project},
};

const API_PREFIX: &str = "/api/v1";

/// Bearer JWT for scripts, the session cookie for browsers. Both carry the same token.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.security_schemes.insert(
            "BearerAuth".to_string(),
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some(
                        "The `access_token` returned by `/authentication/login`:\n\n\
                        ```\nAuthorization: Bearer YOUR_TOKEN\n```",
                    ))
                    .build(),
            ),
        );
        components.security_schemes.insert(
            "CookieAuth".to_string(),
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "bizctl_session",
                "Session cookie set by `/authentication/login`",
            ))),
        );
    }
}

/// Documents the five record resources, which share one set of generic handlers.
struct RecordPathsAddon;

impl Modify for RecordPathsAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        add_record_paths::<CommercialCustomer>(openapi);
        add_record_paths::<PersonalCustomer>(openapi);
        add_record_paths::<Project>(openapi);
        add_record_paths::<Employee>(openapi);
        add_record_paths::<Competitor>(openapi);
    }
}

fn integer(format: KnownFormat) -> RefOr<Schema> {
    RefOr::T(Schema::Object(
        ObjectBuilder::new()
            .schema_type(Type::Integer)
            .format(Some(SchemaFormat::KnownFormat(format)))
            .build(),
    ))
}

fn json_response(description: &str, schema: RefOr<Schema>) -> utoipa::openapi::Response {
    ResponseBuilder::new()
        .description(description)
        .content("application/json", ContentBuilder::new().schema(Some(schema)).build())
        .build()
}

fn plain_response(description: &str) -> utoipa::openapi::Response {
    ResponseBuilder::new().description(description).build()
}

fn operation<R: BusinessRecord>(summary: String) -> OperationBuilder {
    OperationBuilder::new()
        .tag(R::RESOURCE)
        .summary(Some(summary))
        .securities(Some([
            SecurityRequirement::new("BearerAuth", Vec::<String>::new()),
            SecurityRequirement::new("CookieAuth", Vec::<String>::new()),
        ]))
        .response("401", plain_response("Not authenticated"))
}

fn with_id<R: BusinessRecord>(builder: OperationBuilder) -> Operation {
    builder
        .parameter(
            ParameterBuilder::new()
                .name("id")
                .parameter_in(ParameterIn::Path)
                .required(Required::True)
                .description(Some(format!("{} id", R::LABEL)))
                .schema(Some(integer(KnownFormat::Int64))),
        )
        .response("404", plain_response(&format!("{} not found", R::LABEL)))
        .build()
}

fn add_record_paths<R: BusinessRecord>(openapi: &mut utoipa::openapi::OpenApi) {
    let name = <R as ToSchema>::name();
    let record = || RefOr::Ref(Ref::from_schema_name(name.clone()));

    openapi
        .components
        .get_or_insert_with(Default::default)
        .schemas
        .insert(name.to_string(), <R as utoipa::PartialSchema>::schema());

    let page = RefOr::T(Schema::Object(
        ObjectBuilder::new()
            .property("data", RefOr::T(Schema::Array(Array::new(record()))))
            .property("total_count", integer(KnownFormat::Int64))
            .property("skip", integer(KnownFormat::Int64))
            .property("limit", integer(KnownFormat::Int64))
            .required("data")
            .required("total_count")
            .build(),
    ));
    let patch = RequestBodyBuilder::new()
        .description(Some("Any subset of the record's fields; `id` and unknown keys are ignored"))
        .content(
            "application/json",
            ContentBuilder::new()
                .schema(Some(RefOr::T(Schema::Object(ObjectBuilder::new().schema_type(Type::Object).build()))))
                .build(),
        )
        .required(Some(Required::True))
        .build();
    let detail = RefOr::Ref(Ref::from_schema_name("DetailResponse"));

    let mut collection = PathItem::default();
    collection.get = Some(
            operation::<R>(format!("List {} records", R::LABEL))
                .parameter(
                    ParameterBuilder::new()
                        .name("skip")
                        .parameter_in(ParameterIn::Query)
                        .schema(Some(integer(KnownFormat::Int64))),
                )
                .parameter(
                    ParameterBuilder::new()
                        .name("limit")
                        .parameter_in(ParameterIn::Query)
                        .schema(Some(integer(KnownFormat::Int64))),
                )
                .response("200", json_response("Page of records in id order", page))
                .build(),
        );
    collection.post = Some(
            operation::<R>(format!("Create a {} filled with generated sample data", R::LABEL))
                .response("201", json_response("The new record", record()))
                .build(),
        );

    let mut item = PathItem::default();
    item.get = Some(with_id::<R>(
            operation::<R>(format!("Get a {}", R::LABEL)).response("200", json_response("The record", record())),
        ));
    item.put = Some(with_id::<R>(
            operation::<R>(format!("Update a {}", R::LABEL))
                .request_body(Some(patch))
                .response("200", json_response("The updated record", record()))
                .response("400", plain_response("A field has the wrong type")),
        ));
    item.delete = Some(with_id::<R>(
            operation::<R>(format!("Delete a {}", R::LABEL)).response("200", json_response("Deletion confirmed", detail)),
        ));

    openapi.paths.paths.insert(format!("{API_PREFIX}/{}", R::RESOURCE), collection);
    openapi.paths.paths.insert(format!("{API_PREFIX}/{}/{{id}}", R::RESOURCE), item);
}

/// Routes under `/api/v1`
#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::users::get_current_user,
        api::handlers::users::list_users,
        api::handlers::users::get_user,
        api::handlers::users::delete_user,
        api::handlers::payments::purchase,
        api::handlers::predictions::predict,
        api::handlers::entitlements::get_current_entitlements,
        api::handlers::entitlements::list_current_transactions,
        api::handlers::entitlements::get_user_entitlements,
    ),
    components(
        schemas(
            api::models::users::UserResponse,
            api::models::payments::PaidModels,
            api::models::payments::PaymentResponse,
            api::models::predictions::PredictionResponse,
            api::models::entitlements::EntitlementResponse,
            api::models::entitlements::LedgerTransactionResponse,
            api::models::records::DetailResponse,
            crate::inference::Features,
        )
    )
)]
pub struct ApiV1Doc;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "bizctl",
        description = "Business-record administration with a credit-gated prediction service.",
    ),
    modifiers(&SecurityAddon, &RecordPathsAddon),
    paths(
        api::handlers::auth::register,
        api::handlers::auth::login,
        api::handlers::auth::logout,
    ),
    nest(
        (path = "/api/v1", api = ApiV1Doc)
    ),
    components(
        schemas(
            api::models::auth::RegisterRequest,
            api::models::auth::LoginRequest,
            api::models::auth::AuthResponse,
            api::models::auth::AuthSuccessResponse,
        )
    ),
    tags(
        (name = "authentication", description = "Registration, login and logout"),
        (name = "users", description = "Accounts; listing and deleting others needs a superuser"),
        (name = "payments", description = "Buying model tiers and credits"),
        (name = "predictions", description = "Paid loan-approval predictions"),
        (name = "entitlements", description = "Unlocked tiers, balances and ledger history"),
        (name = "commercial-customers", description = "Commercial customer records"),
        (name = "personal-customers", description = "Personal customer records"),
        (name = "projects", description = "Project records"),
        (name = "employees", description = "Employee records"),
        (name = "competitors", description = "Competitor records"),
    )
)]
pub struct ApiDoc;
