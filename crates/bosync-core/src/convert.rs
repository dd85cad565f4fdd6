// ── API-to-domain type conversions ──
//
// Bridges the gateway's wire types into the engine's model. Empty owner
// ids become `None`, property values become `DataValue`, and webhook alarm
// timestamps are parsed into UTC.

use chrono::{DateTime, NaiveDateTime, Utc};

use bosync_api::models::{
    AssetDto, DataTypeDto, DatapointDto, DatapointTemplateDto, LiveAlarmDto, OntologyDto,
    PropertyDto, PropertyTemplateDto, SpaceDto, TemplateDto, UnitDto,
};

use crate::error::CoreError;
use crate::model::ontology::non_empty;
use crate::model::{
    AlarmEvent, Asset, DataType, DataTypeField, DatapointInstance, DatapointTemplate,
    InstanceOwner, Ontology, PropertyInstance, PropertyTemplate, Space, SpaceAssetRef,
    TemplateHeader, TemplateOwner, Unit,
};

/// Alarm timestamps arrive as `dd/MM/yyyy HH:mm:ss`, always UTC.
const ALARM_TIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

// ── Ontology ───────────────────────────────────────────────────────

impl From<OntologyDto> for Ontology {
    fn from(dto: OntologyDto) -> Self {
        Self {
            version: dto.settings.version,
            asset_templates: dto.asset_templates.into_iter().map(Into::into).collect(),
            space_templates: dto.space_templates.into_iter().map(Into::into).collect(),
            units: dto.units.into_iter().map(Into::into).collect(),
            data_types: dto.data_types.into_iter().map(Into::into).collect(),
            datapoint_templates: dto.datapoint_templates.into_iter().map(Into::into).collect(),
            property_templates: dto.property_templates.into_iter().map(Into::into).collect(),
            assets: dto.assets.into_iter().map(Into::into).collect(),
            spaces: dto.spaces.into_iter().map(Into::into).collect(),
            datapoints: dto.datapoints.into_iter().map(Into::into).collect(),
            properties: dto.properties.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<TemplateDto> for TemplateHeader {
    fn from(dto: TemplateDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
            tags: dto.tags,
        }
    }
}

impl From<UnitDto> for Unit {
    fn from(dto: UnitDto) -> Self {
        Self {
            id: dto.id,
            symbol: dto.symbol,
        }
    }
}

impl From<DataTypeDto> for DataType {
    fn from(dto: DataTypeDto) -> Self {
        Self {
            id: dto.id,
            format: dto.format,
            name: dto.name,
            unit_id: non_empty(dto.unit_id),
            fields: dto
                .fields
                .into_iter()
                .map(|f| DataTypeField {
                    name: f.name,
                    type_id: f.type_id,
                })
                .collect(),
            min: dto.min,
            max: dto.max,
            enums: dto.enums,
        }
    }
}

impl From<DatapointTemplateDto> for DatapointTemplate {
    fn from(dto: DatapointTemplateDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
            owner: TemplateOwner::from_ids(
                non_empty(dto.asset_template_id),
                non_empty(dto.space_template_id),
            ),
            type_id: dto.type_id,
            direction: dto.direction,
        }
    }
}

impl From<PropertyTemplateDto> for PropertyTemplate {
    fn from(dto: PropertyTemplateDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
            owner: TemplateOwner::from_ids(
                non_empty(dto.asset_template_id),
                non_empty(dto.space_template_id),
            ),
            type_id: dto.type_id,
        }
    }
}

impl From<AssetDto> for Asset {
    fn from(dto: AssetDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
            template_id: dto.template_id,
        }
    }
}

impl From<SpaceDto> for Space {
    fn from(dto: SpaceDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
            parent_id: non_empty(dto.parent_id),
            template_id: dto.template_id,
            assets: dto
                .assets
                .into_iter()
                .map(|a| SpaceAssetRef {
                    id: a.id,
                    is_master: a.master,
                })
                .collect(),
        }
    }
}

impl From<DatapointDto> for DatapointInstance {
    fn from(dto: DatapointDto) -> Self {
        Self {
            id: dto.id,
            template_id: dto.template_id,
            owner: InstanceOwner {
                asset_id: non_empty(dto.asset_id),
                space_id: non_empty(dto.space_id),
            },
        }
    }
}

impl From<PropertyDto> for PropertyInstance {
    fn from(dto: PropertyDto) -> Self {
        Self {
            id: dto.id,
            template_id: dto.template_id,
            owner: InstanceOwner {
                asset_id: non_empty(dto.asset_id),
                space_id: non_empty(dto.space_id),
            },
            value: dto.value.filter(|v| !v.is_null()).map(Into::into),
        }
    }
}

// ── Alarms ─────────────────────────────────────────────────────────

/// Parse a vendor alarm timestamp (`dd/MM/yyyy HH:mm:ss`, UTC).
pub fn parse_alarm_timestamp(raw: &str) -> Result<DateTime<Utc>, CoreError> {
    NaiveDateTime::parse_from_str(raw, ALARM_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| CoreError::InvalidPayload {
            message: format!("alarm timestamp {raw:?}: {e}"),
        })
}

impl TryFrom<LiveAlarmDto> for AlarmEvent {
    type Error = CoreError;

    fn try_from(dto: LiveAlarmDto) -> Result<Self, Self::Error> {
        Ok(Self {
            timestamp: parse_alarm_timestamp(&dto.time_stamp)?,
            session_id: dto.session_id,
            datapoint_id: dto.data_point_instance_id,
            name: dto.name,
            description: dto.description,
            severity: dto.severity,
            need_acknowledge: dto.need_acknowledge,
            active: dto.active,
            acked: dto.acked,
            closed: dto.closed,
            acked_by: dto.acked_by,
            comment: dto.comment,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    #[test]
    fn empty_owner_ids_become_none() {
        let dto: OntologyDto = serde_json::from_value(json!({
            "settings": { "version": 4 },
            "spaces": [{ "id": "s1", "name": "Building 1", "parentId": "", "templateId": "st" }],
            "datapoints": [{ "id": "dp-1", "templateId": "dpt-1", "assetId": "", "spaceId": "" }],
            "datapointTemplates": [{ "id": "dpt-1", "assetTemplateId": "at", "spaceTemplateId": "st" }]
        }))
        .unwrap();

        let ontology = Ontology::from(dto);
        assert_eq!(ontology.version, 4);
        assert_eq!(ontology.spaces[0].parent_id, None);
        assert!(ontology.datapoints[0].owner.is_orphan());
        assert!(matches!(
            ontology.datapoint_templates[0].owner,
            TemplateOwner::Conflicting { .. }
        ));
    }

    #[test]
    fn alarm_timestamp_is_day_first_utc() {
        let ts = parse_alarm_timestamp("03/02/2024 14:05:09").unwrap();
        assert_eq!((ts.day(), ts.month(), ts.year()), (3, 2, 2024));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (14, 5, 9));
        assert!(parse_alarm_timestamp("2024-02-03T14:05:09Z").is_err());
    }
}
