use crate::definition::FieldSourceDefinition;
use crate::field::FieldDataType;
use crate::sources::{DomainFieldId, FieldSourceTypeId};

/// Fields of a notification (alert delivery) channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelField {
    Id,
    Name,
    Description,
    Enabled,
    DistributionMethod,
    Valid,
    Faulted,
    FaultReason,
    SettingsJson,
}

impl DomainFieldId for ChannelField {
    const ALL: &'static [Self] = &[
        ChannelField::Id,
        ChannelField::Name,
        ChannelField::Description,
        ChannelField::Enabled,
        ChannelField::DistributionMethod,
        ChannelField::Valid,
        ChannelField::Faulted,
        ChannelField::FaultReason,
        ChannelField::SettingsJson,
    ];

    fn ordinal(self) -> usize {
        self as usize
    }

    fn name(self) -> &'static str {
        match self {
            ChannelField::Id => "Id",
            ChannelField::Name => "Name",
            ChannelField::Description => "Description",
            ChannelField::Enabled => "Enabled",
            ChannelField::DistributionMethod => "DistributionMethod",
            ChannelField::Valid => "Valid",
            ChannelField::Faulted => "Faulted",
            ChannelField::FaultReason => "FaultReason",
            ChannelField::SettingsJson => "SettingsJson",
        }
    }

    fn heading(self) -> &'static str {
        match self {
            ChannelField::Id => "Id",
            ChannelField::Name => "Name",
            ChannelField::Description => "Description",
            ChannelField::Enabled => "Enabled",
            ChannelField::DistributionMethod => "Method",
            ChannelField::Valid => "Valid",
            ChannelField::Faulted => "Faulted",
            ChannelField::FaultReason => "Fault",
            ChannelField::SettingsJson => "Settings",
        }
    }

    fn data_type(self) -> FieldDataType {
        match self {
            ChannelField::Id
            | ChannelField::Name
            | ChannelField::Description
            | ChannelField::FaultReason
            | ChannelField::SettingsJson => FieldDataType::Text,
            ChannelField::Enabled | ChannelField::Valid | ChannelField::Faulted => {
                FieldDataType::Boolean
            }
            ChannelField::DistributionMethod => FieldDataType::Enumeration,
        }
    }

    fn is_validity(self) -> bool {
        matches!(self, ChannelField::Valid)
    }
}

pub(crate) fn definition() -> FieldSourceDefinition {
    // Raw settings are channel-implementation specific and never shown.
    FieldSourceDefinition::build(
        FieldSourceTypeId::NotificationChannel,
        &[ChannelField::SettingsJson],
        &[ChannelField::Name],
    )
}
