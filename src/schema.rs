// Declared table schemas for the two datasets.
// Column types and descriptions are static metadata, not inferred from data;
// the loader coerces CSV text to match and skips rows that cannot be coerced.

use serde::Serialize;

/// Semantic type of a column after load-time coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    Text,
    Category,
    Currency,
    Number,
    Percentage,
    Date,
}

impl SemanticType {
    pub fn name(&self) -> &'static str {
        match self {
            SemanticType::Text => "text",
            SemanticType::Category => "category",
            SemanticType::Currency => "currency",
            SemanticType::Number => "number",
            SemanticType::Percentage => "percentage",
            SemanticType::Date => "date",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub semantic: SemanticType,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TableSchema {
    pub table: &'static str,
    pub description: &'static str,
    pub columns: &'static [ColumnSpec],
}

pub const GUEST_CARDS: TableSchema = TableSchema {
    table: "guest_cards",
    description: "Prospective tenant inquiries and their stated qualifications.",
    columns: &[
        ColumnSpec {
            name: "name",
            semantic: SemanticType::Text,
            description: "Prospect name, e.g. \"Martinez, Sofia\"",
        },
        ColumnSpec {
            name: "interest_received",
            semantic: SemanticType::Date,
            description: "Date of the initial inquiry",
        },
        ColumnSpec {
            name: "last_activity_date",
            semantic: SemanticType::Date,
            description: "Date of the most recent activity",
        },
        ColumnSpec {
            name: "last_activity_type",
            semantic: SemanticType::Category,
            description: "Most recent activity, e.g. Email Sent, Email Received, \
                          Pre-qualification Form Submitted",
        },
        ColumnSpec {
            name: "status",
            semantic: SemanticType::Category,
            description: "Lead status: active, pending, withdrawn or confirmed",
        },
        ColumnSpec {
            name: "move_in_preference",
            semantic: SemanticType::Text,
            description: "Desired move-in timeframe",
        },
        ColumnSpec {
            name: "max_rent",
            semantic: SemanticType::Currency,
            description: "Maximum monthly rent budget",
        },
        ColumnSpec {
            name: "bed_bath",
            semantic: SemanticType::Text,
            description: "Preferred bed/bath configuration, e.g. \"2/1.00\"",
        },
        ColumnSpec {
            name: "pet_preference",
            semantic: SemanticType::Category,
            description: "Pet type (Dogs, Cats, Other); empty means no pets",
        },
        ColumnSpec {
            name: "monthly_income",
            semantic: SemanticType::Currency,
            description: "Stated monthly income",
        },
        ColumnSpec {
            name: "credit_score",
            semantic: SemanticType::Number,
            description: "Credit score; a range like \"720 to 799\" is coerced to its midpoint",
        },
    ],
};

pub const NEARBY_UNITS: TableSchema = TableSchema {
    table: "nearby_units",
    description: "Comparable rental listings used as market-rate reference points.",
    columns: &[
        ColumnSpec {
            name: "similarity",
            semantic: SemanticType::Percentage,
            description: "Match percentage to the subject property, e.g. \"96%\"",
        },
        ColumnSpec {
            name: "beds",
            semantic: SemanticType::Number,
            description: "Number of bedrooms",
        },
        ColumnSpec {
            name: "baths",
            semantic: SemanticType::Number,
            description: "Number of bathrooms",
        },
        ColumnSpec {
            name: "sqft",
            semantic: SemanticType::Number,
            description: "Square footage",
        },
        ColumnSpec {
            name: "location",
            semantic: SemanticType::Text,
            description: "Distance description, e.g. \"about 1 mile away\"",
        },
        ColumnSpec {
            name: "last_advertised",
            semantic: SemanticType::Date,
            description: "Date the listing was last advertised",
        },
        ColumnSpec {
            name: "advertised_rent",
            semantic: SemanticType::Currency,
            description: "Listed monthly rent; rows without a positive rent are skipped",
        },
        ColumnSpec {
            name: "source",
            semantic: SemanticType::Text,
            description: "Listing source",
        },
    ],
};

pub const TABLES: [TableSchema; 2] = [GUEST_CARDS, NEARBY_UNITS];

/// Look up the declared schema for a table name.
pub fn table_schema(name: &str) -> Option<TableSchema> {
    TABLES.iter().find(|t| t.table == name).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(table_schema("guest_cards").unwrap().columns.len(), 11);
        assert_eq!(table_schema("nearby_units").unwrap().columns.len(), 8);
        assert!(table_schema("transactions").is_none());
    }

    #[test]
    fn test_column_names_unique_per_table() {
        for table in TABLES {
            let mut names: Vec<_> = table.columns.iter().map(|c| c.name).collect();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), table.columns.len(), "{}", table.table);
        }
    }

    #[test]
    fn test_serializes_for_dispatch_layer() {
        let json = serde_json::to_value(GUEST_CARDS).unwrap();
        assert_eq!(json["table"], "guest_cards");
        assert_eq!(json["columns"][4]["name"], "status");
        assert_eq!(json["columns"][4]["semantic"], "category");
    }
}
