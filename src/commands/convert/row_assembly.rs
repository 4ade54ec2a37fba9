use super::*;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Float(f64),
    Text(String),
}

impl CellValue {
    pub fn to_field(&self) -> String {
        match self {
            Self::Float(value) => value.to_string(),
            Self::Text(value) => value.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct RowSet {
    pub header: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

/// Flattens a batch of records into header + rows. Columns are the fixed
/// leaders (x, y, id, text), an icon column when any record resolved one,
/// then the sorted union of attribute keys. Column order is stable for a
/// given record set; row order follows record order.
pub fn assemble_rows(records: &[PointRecord]) -> RowSet {
    let with_icon = records.iter().any(|record| record.icon.is_some());

    let mut key_union = BTreeSet::new();
    for record in records {
        for key in record.attributes.keys() {
            if with_icon && key == "icon" {
                continue;
            }
            key_union.insert(key.clone());
        }
    }
    let keys = key_union.into_iter().collect::<Vec<String>>();

    let mut header = ["x", "y", "id", "text"]
        .iter()
        .map(|column| column.to_string())
        .collect::<Vec<String>>();
    if with_icon {
        header.push("icon".to_string());
    }
    header.extend(keys.iter().cloned());

    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        let mut row = vec![
            CellValue::Float(record.longitude),
            CellValue::Float(record.latitude),
            CellValue::Text(record.name.clone()),
            CellValue::Text(record.text.clone()),
        ];
        if with_icon {
            row.push(CellValue::Text(
                record
                    .icon
                    .as_ref()
                    .map(|icon| icon.path.clone())
                    .unwrap_or_default(),
            ));
        }
        for key in &keys {
            row.push(CellValue::Text(
                record.attributes.get(key).cloned().unwrap_or_default(),
            ));
        }
        rows.push(row);
    }

    RowSet { header, rows }
}
