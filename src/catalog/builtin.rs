use super::{EntityTypeDefinition, FieldDefinition, FieldType};

fn field(key: &str, label: &str, field_type: FieldType) -> FieldDefinition {
    FieldDefinition::new(key, label, field_type)
}

fn strings(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|key| key.to_string()).collect()
}

/// Entity types of the pet-care business records database.
pub fn builtin_entity_types() -> Vec<EntityTypeDefinition> {
    use FieldType::*;

    vec![
        EntityTypeDefinition {
            id: "owners".into(),
            label: "Owners".into(),
            label_singular: "Owner".into(),
            label_plural: "Owners".into(),
            description: "Pet owners and their contact details".into(),
            fields: vec![
                field("id", "Owner ID", String),
                field("firstName", "First Name", String),
                field("lastName", "Last Name", String),
                field("email", "Email", String),
                field("phone", "Phone", String),
                field("address", "Address", Text),
                field("city", "City", String),
                field("state", "State", String),
                field("zipCode", "Zip Code", String),
                field("emailOptIn", "Email Opt-In", Boolean),
                field("notes", "Notes", Text),
            ],
            required_fields: strings(&["firstName", "lastName"]),
            unique_identifier_fields: strings(&["id", "email", "phone"]),
            associable_with: strings(&["pets"]),
        },
        EntityTypeDefinition {
            id: "pets".into(),
            label: "Pets".into(),
            label_singular: "Pet".into(),
            label_plural: "Pets".into(),
            description: "Animals cared for by the business".into(),
            fields: vec![
                field("id", "Pet ID", String),
                field("name", "Name", String),
                field("species", "Species", Enum),
                field("breed", "Breed", String),
                field("dateOfBirth", "Date of Birth", Date),
                field("weight", "Weight", Number),
                field("sex", "Sex", Enum),
                field("color", "Color", String),
                field("microchipNumber", "Microchip Number", String),
                field("isNeutered", "Neutered", Boolean),
                field("notes", "Notes", Text),
            ],
            required_fields: strings(&["name", "species"]),
            unique_identifier_fields: strings(&["id", "name", "microchipNumber"]),
            associable_with: strings(&["owners", "bookings", "vaccinations"]),
        },
        EntityTypeDefinition {
            id: "bookings".into(),
            label: "Bookings".into(),
            label_singular: "Booking".into(),
            label_plural: "Bookings".into(),
            description: "Reservations for boarding, grooming and daycare".into(),
            fields: vec![
                field("id", "Booking ID", String),
                field("startDate", "Start Date", Date),
                field("endDate", "End Date", Date),
                field("status", "Status", Enum),
                field("totalPrice", "Total Price", Number),
                field("depositPaid", "Deposit Paid", Boolean),
                field("notes", "Notes", Text),
            ],
            required_fields: strings(&["startDate"]),
            unique_identifier_fields: strings(&["id"]),
            associable_with: strings(&["pets", "services"]),
        },
        EntityTypeDefinition {
            id: "services".into(),
            label: "Services".into(),
            label_singular: "Service".into(),
            label_plural: "Services".into(),
            description: "Bookable services and their pricing".into(),
            fields: vec![
                field("id", "Service ID", String),
                field("name", "Name", String),
                field("description", "Description", Text),
                field("price", "Price", Number),
                field("durationMinutes", "Duration (minutes)", Number),
                field("isActive", "Active", Boolean),
            ],
            required_fields: strings(&["name"]),
            unique_identifier_fields: strings(&["id", "name"]),
            associable_with: strings(&["bookings"]),
        },
        EntityTypeDefinition {
            id: "vaccinations".into(),
            label: "Vaccinations".into(),
            label_singular: "Vaccination".into(),
            label_plural: "Vaccinations".into(),
            description: "Vaccination records attached to pets".into(),
            fields: vec![
                field("id", "Vaccination ID", String),
                field("vaccineName", "Vaccine", String),
                field("administeredDate", "Administered Date", Date),
                field("expirationDate", "Expiration Date", Date),
                field("veterinarian", "Veterinarian", String),
                field("notes", "Notes", Text),
            ],
            required_fields: strings(&["vaccineName", "administeredDate"]),
            unique_identifier_fields: strings(&["id"]),
            associable_with: strings(&["pets"]),
        },
        EntityTypeDefinition {
            id: "staff".into(),
            label: "Staff".into(),
            label_singular: "Staff Member".into(),
            label_plural: "Staff".into(),
            description: "Employees and their roles".into(),
            fields: vec![
                field("id", "Staff ID", String),
                field("firstName", "First Name", String),
                field("lastName", "Last Name", String),
                field("email", "Email", String),
                field("phone", "Phone", String),
                field("role", "Role", Enum),
                field("hireDate", "Hire Date", Date),
            ],
            required_fields: strings(&["firstName", "lastName", "email"]),
            unique_identifier_fields: strings(&["id", "email"]),
            associable_with: Vec::new(),
        },
    ]
}
