//! Task record field schema.
//!
//! One enumerated list of the editable fields drives form layout, dirty
//! comparison and write payloads, so they cannot drift apart.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldKind {
    Text,
    Date,
}

/// The eleven editable fields of a task record, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskField {
    Project,
    AssignedAgent,
    DeploymentDate,
    JurisdictionCountry,
    JurisdictionCity,
    InquiryVia,
    ClientName,
    Contacts,
    CommsChannel,
    DdDoc,
    Pay,
}

impl TaskField {
    pub const ALL: [TaskField; 11] = [
        TaskField::Project,
        TaskField::AssignedAgent,
        TaskField::DeploymentDate,
        TaskField::JurisdictionCountry,
        TaskField::JurisdictionCity,
        TaskField::InquiryVia,
        TaskField::ClientName,
        TaskField::Contacts,
        TaskField::CommsChannel,
        TaskField::DdDoc,
        TaskField::Pay,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TaskField::Project => "project",
            TaskField::AssignedAgent => "assigned_agent",
            TaskField::DeploymentDate => "deployment_date",
            TaskField::JurisdictionCountry => "jurisdiction_country",
            TaskField::JurisdictionCity => "jurisdiction_city",
            TaskField::InquiryVia => "inquiry_via",
            TaskField::ClientName => "client_name",
            TaskField::Contacts => "contacts",
            TaskField::CommsChannel => "comms_channel",
            TaskField::DdDoc => "dd_doc",
            TaskField::Pay => "pay",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TaskField::Project => "Project",
            TaskField::AssignedAgent => "Assigned Agent",
            TaskField::DeploymentDate => "Deployment Date",
            TaskField::JurisdictionCountry => "Jurisdiction Country",
            TaskField::JurisdictionCity => "Jurisdiction City",
            TaskField::InquiryVia => "Inquiry Via",
            TaskField::ClientName => "Client Name",
            TaskField::Contacts => "Contacts",
            TaskField::CommsChannel => "Comms Channel",
            TaskField::DdDoc => "DD / DOC",
            TaskField::Pay => "Pay",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            TaskField::DeploymentDate => FieldKind::Date,
            _ => FieldKind::Text,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|field| field.name() == name)
    }
}

impl fmt::Display for TaskField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A displayable column: an editable field or one of the server audit stamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Field(TaskField),
    CreatedAt,
    UpdatedAt,
}

impl Column {
    pub fn name(self) -> &'static str {
        match self {
            Column::Field(field) => field.name(),
            Column::CreatedAt => "created_at",
            Column::UpdatedAt => "updated_at",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Column::Field(field) => field.label(),
            Column::CreatedAt => "Created At",
            Column::UpdatedAt => "Updated At",
        }
    }

    /// Audit columns are never part of the default table layout.
    pub fn is_secondary(self) -> bool {
        matches!(self, Column::CreatedAt | Column::UpdatedAt)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "created_at" => Some(Column::CreatedAt),
            "updated_at" => Some(Column::UpdatedAt),
            other => TaskField::from_name(other).map(Column::Field),
        }
    }
}

pub const COLUMN_ORDER: [Column; 13] = [
    Column::Field(TaskField::Project),
    Column::Field(TaskField::AssignedAgent),
    Column::Field(TaskField::DeploymentDate),
    Column::Field(TaskField::JurisdictionCountry),
    Column::Field(TaskField::JurisdictionCity),
    Column::Field(TaskField::InquiryVia),
    Column::Field(TaskField::ClientName),
    Column::Field(TaskField::Contacts),
    Column::Field(TaskField::CommsChannel),
    Column::Field(TaskField::DdDoc),
    Column::Field(TaskField::Pay),
    Column::CreatedAt,
    Column::UpdatedAt,
];

#[derive(Debug, Clone, Copy)]
pub struct FieldGroup {
    pub title: &'static str,
    pub fields: &'static [TaskField],
}

pub const FORM_GROUPS: [FieldGroup; 4] = [
    FieldGroup {
        title: "Project",
        fields: &[
            TaskField::Project,
            TaskField::AssignedAgent,
            TaskField::DeploymentDate,
        ],
    },
    FieldGroup {
        title: "Jurisdiction",
        fields: &[TaskField::JurisdictionCity, TaskField::JurisdictionCountry],
    },
    FieldGroup {
        title: "Client & inquiry",
        fields: &[
            TaskField::InquiryVia,
            TaskField::ClientName,
            TaskField::Contacts,
            TaskField::CommsChannel,
        ],
    },
    FieldGroup {
        title: "Commercial",
        fields: &[TaskField::DdDoc, TaskField::Pay],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_name() {
        for field in TaskField::ALL {
            assert_eq!(TaskField::from_name(field.name()), Some(field));
        }
        assert_eq!(TaskField::from_name("id"), None);
        assert_eq!(Column::from_name("created_at"), Some(Column::CreatedAt));
    }

    #[test]
    fn form_groups_cover_every_field_once() {
        let mut seen: Vec<TaskField> = FORM_GROUPS
            .iter()
            .flat_map(|group| group.fields.iter().copied())
            .collect();
        seen.sort();
        assert_eq!(seen, TaskField::ALL.to_vec());
    }

    #[test]
    fn only_deployment_date_is_a_date() {
        let dates: Vec<_> = TaskField::ALL
            .into_iter()
            .filter(|field| field.kind() == FieldKind::Date)
            .collect();
        assert_eq!(dates, vec![TaskField::DeploymentDate]);
    }
}
