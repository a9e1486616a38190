//! Property rows of a company's sheet → properties of that company.

use std::{str::FromStr, sync::Arc};

use chrono::Utc;
use db::{
    DBService,
    models::{
        company::Company,
        property::{CreateProperty, Property, PropertyType, UpdateProperty},
    },
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    ImportError, ImportRequest, ImportTally, Lookup, RowFailure, RowOutcome, SyncResult,
    load_sheet,
    marker::{compose_description, format_marker, recompose_description},
    row_parser::{ImportRecord, ParsedRow, PropertyImportRow, parse_rows},
};
use crate::services::google_sheets::SheetSource;

pub struct PropertyImporter {
    db: DBService,
    source: Arc<dyn SheetSource>,
}

impl PropertyImporter {
    pub fn new(db: DBService, source: Arc<dyn SheetSource>) -> Self {
        Self { db, source }
    }

    pub async fn import(
        &self,
        company_id: Uuid,
        request: &ImportRequest,
    ) -> Result<SyncResult, ImportError> {
        let company = Company::find_by_id(&self.db.pool, company_id)
            .await?
            .ok_or(ImportError::CompanyNotFound(company_id))?;

        let ImportTally {
            result,
            heuristic_rows,
        } = self.import_rows(&company, request).await?;

        if heuristic_rows > 0 {
            warn!(
                company_id = %company.id,
                rows = heuristic_rows,
                "Rows without a unique value were matched by address; duplicates may be merged or created"
            );
        }

        Company::touch_last_synced(&self.db.pool, company.id, Utc::now()).await?;

        info!(
            company_id = %company.id,
            created = result.created,
            updated = result.updated,
            skipped = result.skipped,
            errors = result.errors,
            "Property sheet import finished"
        );

        Ok(result)
    }

    async fn import_rows(
        &self,
        company: &Company,
        request: &ImportRequest,
    ) -> Result<ImportTally, ImportError> {
        let (headers, rows) =
            load_sheet(self.source.as_ref(), request, PropertyImportRow::KIND).await?;
        let parsed = parse_rows::<PropertyImportRow>(
            &rows,
            &headers,
            &request.column_mapping,
            request.unique_column(),
        );

        let mut tally = ImportTally::new(parsed.skipped);

        for row in &parsed.rows {
            match self.import_row(company.id, row).await {
                Ok((outcome, lookup)) => tally.record_success(outcome, lookup),
                Err(e) => {
                    warn!(
                        company_id = %company.id,
                        row = row.row_number,
                        error = %e,
                        "Property row import failed"
                    );
                    tally
                        .result
                        .record_error(row.row_number, row.fields.clone(), e.to_string());
                }
            }
        }

        Ok(tally)
    }

    async fn import_row(
        &self,
        company_id: Uuid,
        row: &ParsedRow<PropertyImportRow>,
    ) -> Result<(RowOutcome, Lookup), RowFailure> {
        let record = &row.record;
        let property_type = record
            .property_type
            .as_deref()
            .map(parse_property_type)
            .transpose()?;
        let unit_count = record
            .unit_count
            .as_deref()
            .map(parse_unit_count)
            .transpose()?;

        let (existing, lookup) = match row.unique_value.as_deref() {
            Some(value) => (
                Property::find_by_marker(&self.db.pool, company_id, &format_marker(value)).await?,
                Lookup::Marker,
            ),
            None => (
                Property::find_by_address(&self.db.pool, company_id, &record.address).await?,
                Lookup::Heuristic,
            ),
        };

        match existing {
            Some(property) => {
                let notes = recompose_description(
                    property.notes.as_deref(),
                    row.unique_value.as_deref(),
                    record.notes.as_deref(),
                );
                Property::update(
                    &self.db.pool,
                    property.id,
                    &UpdateProperty {
                        address: Some(record.address.clone()),
                        postcode: record.postcode.clone(),
                        property_type,
                        unit_count,
                        notes,
                    },
                )
                .await?;
                debug!(property_id = %property.id, row = row.row_number, ?lookup, "Updated property from sheet");
                Ok((RowOutcome::Updated, lookup))
            }
            None => {
                let notes =
                    compose_description(row.unique_value.as_deref(), record.notes.as_deref());
                let property = Property::create(
                    &self.db.pool,
                    &CreateProperty {
                        company_id,
                        address: record.address.clone(),
                        postcode: record.postcode.clone(),
                        property_type,
                        unit_count,
                        notes,
                    },
                    Uuid::new_v4(),
                )
                .await?;
                debug!(property_id = %property.id, row = row.row_number, "Created property from sheet");
                Ok((RowOutcome::Created, lookup))
            }
        }
    }
}

fn parse_property_type(raw: &str) -> Result<PropertyType, RowFailure> {
    PropertyType::from_str(raw.trim()).map_err(|_| RowFailure::InvalidPropertyType(raw.to_string()))
}

fn parse_unit_count(raw: &str) -> Result<i64, RowFailure> {
    match raw.trim().parse::<i64>() {
        Ok(count) if count >= 0 => Ok(count),
        _ => Err(RowFailure::InvalidUnitCount(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::sheet_import::{mapping::ColumnMapping, test_support::FakeSheet};

    async fn setup(rows: &[&[&str]]) -> (DBService, Company, Arc<FakeSheet>) {
        let db = DBService::new_in_memory().await.unwrap();
        let company = Company::create(&db.pool, Uuid::new_v4(), "Acme Lettings")
            .await
            .unwrap();
        (db, company, Arc::new(FakeSheet::new(rows)))
    }

    fn request(unique_column: Option<&str>) -> ImportRequest {
        ImportRequest {
            spreadsheet_id: "sheet-2".to_string(),
            sheet_name: "Properties".to_string(),
            column_mapping: ColumnMapping::new()
                .with("Address", "address")
                .with("Postcode", "postcode")
                .with("Type", "propertyType")
                .with("Units", "unitCount")
                .with("Notes", "notes"),
            unique_column: unique_column.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_imports_and_normalizes_properties() {
        let (db, company, sheet) = setup(&[
            &["Address", "Postcode", "Type", "Units", "Notes", "Ref"],
            &["1 High St", "AB1 2CD", "HMO", "6", "corner plot", "P-1"],
            &["2 Low Rd", "", "Apartment", "", "", "P-2"],
        ])
        .await;
        let importer = PropertyImporter::new(db.clone(), sheet);

        let result = importer.import(company.id, &request(Some("Ref"))).await.unwrap();
        assert_eq!((result.created, result.updated, result.errors), (2, 0, 0));

        let properties = Property::find_by_company_id(&db.pool, company.id).await.unwrap();
        let high = properties.iter().find(|p| p.address == "1 High St").unwrap();
        assert_eq!(high.property_type, Some(PropertyType::Hmo));
        assert_eq!(high.property_type.unwrap().to_string(), "hmo");
        assert_eq!(high.unit_count, Some(6));
        assert_eq!(high.notes.as_deref(), Some("[UNIQUE:P-1] corner plot"));

        let again = importer.import(company.id, &request(Some("Ref"))).await.unwrap();
        assert_eq!((again.created, again.updated), (0, 2));

        let company = Company::find_by_id(&db.pool, company.id).await.unwrap().unwrap();
        assert!(company.last_synced_at.is_some());
    }

    #[tokio::test]
    async fn test_invalid_type_and_unit_count_are_row_errors() {
        let (db, company, sheet) = setup(&[
            &["Address", "Type", "Units"],
            &["1 High St", "castle", "2"],
            &["2 Low Rd", "house", "-1"],
            &["3 Mid Ln", "house", "two"],
            &["4 Top Rd", "BLOCK", "12"],
        ])
        .await;
        let importer = PropertyImporter::new(db.clone(), sheet);

        let result = importer.import(company.id, &request(None)).await.unwrap();

        assert_eq!(result.created, 1);
        assert_eq!(result.errors, 3);
        assert_eq!(
            result.error_details.iter().map(|e| e.row).collect::<Vec<_>>(),
            vec![2, 3, 4]
        );
        assert!(result.error_details[0].message.contains("castle"));
    }

    #[tokio::test]
    async fn test_failed_rows_are_not_counted_as_address_matches() {
        let (db, company, sheet) = setup(&[
            &["Address", "Type", "Ref"],
            &["1 High St", "castle", ""],
            &["2 Low Rd", "house", ""],
            &["3 Mid Ln", "house", "P-3"],
        ])
        .await;
        let importer = PropertyImporter::new(db.clone(), sheet);

        let tally = importer
            .import_rows(&company, &request(Some("Ref")))
            .await
            .unwrap();

        assert_eq!((tally.result.created, tally.result.errors), (2, 1));
        assert_eq!(tally.heuristic_rows, 1);
    }

    #[tokio::test]
    async fn test_address_fallback_and_mandatory_address() {
        let (db, company, sheet) = setup(&[
            &["Address", "Postcode"],
            &["1 High St", "AB1"],
            &["", "ZZ9"],
        ])
        .await;
        let importer = PropertyImporter::new(db.clone(), sheet.clone());
        let first = importer.import(company.id, &request(None)).await.unwrap();
        assert_eq!((first.created, first.skipped), (1, 1));

        sheet.set_rows(&[&["Address", "Postcode"], &["1 High St", "AB1 9XY"]]);
        let second = importer.import(company.id, &request(None)).await.unwrap();
        assert_eq!((second.created, second.updated), (0, 1));

        let properties = Property::find_by_company_id(&db.pool, company.id).await.unwrap();
        assert_eq!(properties.len(), 1);
        assert_eq!(properties[0].postcode.as_deref(), Some("AB1 9XY"));
    }

    #[tokio::test]
    async fn test_marker_lookup_is_scoped_to_company() {
        let (db, company, sheet) = setup(&[&["Address", "Ref"], &["1 High St", "P-1"]]).await;
        let other = Company::create(&db.pool, Uuid::new_v4(), "Other").await.unwrap();
        let importer = PropertyImporter::new(db.clone(), sheet);

        importer.import(other.id, &request(Some("Ref"))).await.unwrap();
        let result = importer.import(company.id, &request(Some("Ref"))).await.unwrap();

        assert_eq!(result.created, 1);
        assert_eq!(Property::find_by_company_id(&db.pool, company.id).await.unwrap().len(), 1);
        assert_eq!(Property::find_by_company_id(&db.pool, other.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_company() {
        let (db, _company, sheet) = setup(&[&["Address"], &["1 High St"]]).await;
        let importer = PropertyImporter::new(db, sheet);

        let err = importer.import(Uuid::new_v4(), &request(None)).await.unwrap_err();
        assert!(matches!(err, ImportError::CompanyNotFound(_)));
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_property_type(" Commercial ").unwrap(), PropertyType::Commercial);
        assert!(parse_property_type("bungalow").is_err());
        assert_eq!(parse_unit_count("0").unwrap(), 0);
        assert!(parse_unit_count("1.5").is_err());
    }
}
