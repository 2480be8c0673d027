use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::handlers::{bookings, classes, employees, members, memberships, products};
use crate::models::{
    Booking, BookingInput, BookingStatus, Class, ClassInput, Employee, EmployeeInput, Employment,
    Member, MemberInput, Membership, MembershipInput, Person, PersonInput, PersonOrigin, Product,
    ProductInput, RecordId,
};

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
        components.add_security_scheme(
            "query_token",
            SecurityScheme::ApiKey(ApiKey::Query(ApiKeyValue::new("token"))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz_live,
        crate::handlers::healthz_ready,
        members::list_members,
        members::get_member,
        members::create_member,
        members::update_member,
        members::delete_member,
        employees::list_employees,
        employees::get_employee,
        employees::create_employee,
        employees::update_employee,
        employees::delete_employee,
        memberships::list_memberships,
        memberships::get_membership,
        memberships::create_membership,
        memberships::update_membership,
        memberships::delete_membership,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        classes::list_classes,
        classes::get_class,
        classes::create_class,
        classes::update_class,
        classes::delete_class,
        bookings::list_bookings,
        bookings::get_booking,
        bookings::create_booking,
        bookings::update_booking,
        bookings::delete_booking
    ),
    components(schemas(
        RecordId,
        PersonInput,
        Person,
        PersonOrigin,
        MemberInput,
        Member,
        Employment,
        EmployeeInput,
        Employee,
        MembershipInput,
        Membership,
        ProductInput,
        Product,
        ClassInput,
        Class,
        BookingStatus,
        BookingInput,
        Booking
    )),
    tags(
        (name = "health", description = "Service status"),
        (name = "members", description = "Members and their persons"),
        (name = "employees", description = "Employees and their persons"),
        (name = "memberships", description = "Membership plans"),
        (name = "products", description = "Shop products"),
        (name = "classes", description = "Scheduled classes"),
        (name = "bookings", description = "Class bookings with admission control")
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_resource() {
        let doc = ApiDoc::openapi();
        for path in [
            "/members",
            "/members/{id}",
            "/employees/{id}",
            "/memberships",
            "/products/{id}",
            "/classes",
            "/bookings/{id}",
            "/healthz/ready",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
