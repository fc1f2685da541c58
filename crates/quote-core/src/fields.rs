//! Fixed quote field table and plain-text formatting
//!
//! The same table drives the PDF sections and the plain-text summary, so every
//! domain field shows up in both even when the client left it blank.

use crate::submission::FormFields;

/// Placeholder shown in the PDF for blank fields
pub const NOT_PROVIDED: &str = "Not provided";

/// Header of the plain-text summary
pub const SUMMARY_TITLE: &str = "New AgriBuild quote request";

/// A form field and its display label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
}

/// A titled group of fields
#[derive(Debug, Clone, Copy)]
pub struct Section {
    pub title: &'static str,
    pub fields: &'static [FieldSpec],
}

const fn field(key: &'static str, label: &'static str) -> FieldSpec {
    FieldSpec { key, label }
}

/// Sections in document order
pub const SECTIONS: &[Section] = &[
    Section {
        title: "Project Details",
        fields: &[
            field("supply_option", "Package required"),
            field("division", "Division"),
            field("proposed_use", "Proposed use"),
            field("building_type", "Building type"),
            field("units", "Units"),
            field("length", "Length"),
            field("width", "Width"),
            field("height", "Height"),
            field("project_notes", "Project notes"),
        ],
    },
    Section {
        title: "Specification",
        fields: &[
            field("steelwork_finish", "Steelwork finish"),
            field("roof_material", "Roof material"),
            field("wall_material", "Wall material"),
            field("heated", "Heated"),
            field("cladding", "Cladding preference"),
            field("door_types", "Door types"),
            field("door_details", "Door details"),
            field("internal_fittings", "Internal fittings"),
        ],
    },
    Section {
        title: "Site & Delivery",
        fields: &[
            field("site_postcode", "Site postcode"),
            field("site_address", "Site address"),
            field("site_setting", "Site setting"),
            field("planning_status", "Planning status"),
            field("timescales", "Timescales"),
            field("groundworks", "Groundworks"),
            field("other_info", "Other info"),
        ],
    },
    Section {
        title: "Contact Details",
        fields: &[
            field("first_name", "First name"),
            field("last_name", "Surname"),
            field("email", "Email"),
            field("telephone", "Telephone"),
            field("return_date", "Return date"),
            field("client_message", "Additional requirements"),
            field("hear_about", "Heard about us"),
            field("marketing", "Marketing consent"),
        ],
    },
];

/// Every domain field, in document order
pub fn all_fields() -> impl Iterator<Item = &'static FieldSpec> {
    SECTIONS.iter().flat_map(|section| section.fields.iter())
}

/// `"label: value"`, or `"label:"` when the value is blank
pub fn format_line(label: &str, value: Option<&str>) -> String {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => format!("{label}: {value}"),
        None => format!("{label}:"),
    }
}

/// Trimmed value, or [`NOT_PROVIDED`] when blank or absent
pub fn defaulted_value(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(NOT_PROVIDED)
        .to_string()
}

/// Plain-text summary used for `summary.txt` and the email body.
///
/// One line per domain field, a blank line between sections.
pub fn build_summary(fields: &FormFields) -> String {
    let mut lines = vec![
        SUMMARY_TITLE.to_string(),
        "-".repeat(32),
        String::new(),
    ];

    for (index, section) in SECTIONS.iter().enumerate() {
        if index > 0 {
            lines.push(String::new());
        }
        for spec in section.fields {
            lines.push(format_line(
                spec.label,
                fields.get(spec.key).map(String::as_str),
            ));
        }
    }

    lines.join("\n")
}
