//! Facet catalogue, display metadata and the asset list.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{
    DataMeta, DisplayMeta, FacetCatalogue, FacetKind, FacetMeta, LanguageData, RankMeta, Value,
};
use crate::schema::{Formatting, LanguageSchema, RankOptions, RankOrder, Schema};

pub fn display_meta(schema: &LanguageSchema, date_format: &str) -> DisplayMeta {
    let ranks = schema
        .ranks
        .iter()
        .map(|rank| {
            let options = rank.rank.unwrap_or(RankOptions {
                order_by: RankOrder::AsEntered,
                italicize: false,
            });
            RankMeta {
                column: rank.address.clone(),
                title: rank.title.clone(),
                order_by: options.order_by,
                italicize: options.italicize,
            }
        })
        .collect();

    let data = schema
        .data
        .iter()
        .map(|column| {
            let meta = DataMeta {
                title: column.title.clone(),
                formatting: column.formatting,
                hidden: column.hidden,
                placement: column.placement,
                separator: column.separator,
                template: column.template.clone(),
                badges: column.badges.clone(),
                map: column.map.clone(),
            };
            (column.address.clone(), meta)
        })
        .collect();

    let customization = &schema.customization;
    DisplayMeta {
        checklist_name: customization.checklist_name.clone(),
        about: customization.about.clone(),
        color_theme: customization.color_theme.clone(),
        date_format: customization
            .date_format
            .clone()
            .unwrap_or_else(|| date_format.to_string()),
        ranks,
        data,
    }
}

/// Every rank column plus every data column with a search category.
pub fn facet_catalogue(schema: &LanguageSchema) -> FacetCatalogue {
    let taxa = schema
        .ranks
        .iter()
        .enumerate()
        .map(|(depth, rank)| {
            let meta = FacetMeta {
                category: rank
                    .facet_category
                    .clone()
                    .unwrap_or_else(|| rank.title.clone()),
                kind: FacetKind::Text,
                depth: Some(depth),
                order: Vec::new(),
                badges: Vec::new(),
            };
            (rank.address.clone(), meta)
        })
        .collect();

    let data = schema
        .data
        .iter()
        .filter_map(|column| {
            let category = column.facet_category.clone()?;
            let badges = if column.formatting == Formatting::Badge {
                column.badges.clone()
            } else {
                Vec::new()
            };
            let meta = FacetMeta {
                category,
                kind: FacetKind::for_formatting(column.formatting),
                depth: None,
                order: column.facet_order.clone(),
                badges,
            };
            Some((column.address.clone(), meta))
        })
        .collect();

    FacetCatalogue { taxa, data }
}

/// Media and map sources referenced anywhere, sorted and de-duplicated.
pub fn collect_assets(schema: &Schema, per_language: &BTreeMap<String, LanguageData>) -> Vec<String> {
    let mut assets = BTreeSet::new();
    for language in per_language.values() {
        for entry in &language.entries {
            for value in entry.data.values() {
                for leaf in value.leaves() {
                    if let Value::Media(media) = leaf {
                        assets.insert(media.source.clone());
                    }
                }
            }
        }
    }
    for language in schema.per_language.values() {
        for column in &language.data {
            if let Some(map) = &column.map {
                assets.insert(map.source.clone());
            }
        }
    }
    assets.into_iter().collect()
}
