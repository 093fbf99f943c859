use tantivy::{
    Index,
    TantivyDocument,
    doc,
    schema::*,
    tokenizer::{
        LowerCaser,
        RemoveLongFilter,
        SimpleTokenizer,
        Stemmer,
        TextAnalyzer,
    },
};

use crate::record::Record;

/// Field names used in the schema.
pub mod fields {
    pub const KEY: &str = "key";
    pub const NAME: &str = "name";
    pub const CITY: &str = "city";
    pub const ZIP: &str = "zip";
    pub const COUNTRY: &str = "country";
    pub const ADDRESS: &str = "address";
    pub const LOCATION: &str = "location";
}

/// Name of the English stemming analyzer used by free-text fields.
pub const EN_STEM: &str = "en_stem";

/// Resolved field handles for the schema.
#[derive(Debug, Clone, Copy)]
pub struct SchemaFields {
    pub key: Field,
    pub name: Field,
    pub city: Field,
    pub zip: Field,
    pub country: Field,
    pub address: Field,
    pub location: Field,
}

impl SchemaFields {
    /// Fields the query parser searches by default.
    pub fn searchable(&self) -> Vec<Field> {
        vec![
            self.name,
            self.city,
            self.zip,
            self.country,
            self.address,
            self.location,
        ]
    }

    pub fn to_document(&self, key: &str, record: &Record) -> TantivyDocument {
        doc!(
            self.key => key,
            self.name => record.name.as_str(),
            self.city => record.city.as_str(),
            self.zip => record.zip.as_str(),
            self.country => record.country.as_str(),
            self.address => record.address.as_str(),
            self.location => record.location.as_str(),
        )
    }

    pub fn to_record(&self, doc: &TantivyDocument) -> Record {
        Record {
            name: extract_text(doc, self.name),
            city: extract_text(doc, self.city),
            zip: extract_text(doc, self.zip),
            country: extract_text(doc, self.country),
            address: extract_text(doc, self.address),
            location: extract_text(doc, self.location),
        }
    }
}

/// Build the hotel field mapping.
///
/// Free-text fields go through [`EN_STEM`]. The zip code and the
/// shard-scoped key are indexed as single raw terms so they only match
/// exactly.
pub fn build_schema() -> (Schema, SchemaFields) {
    let mut builder = Schema::builder();

    let text_opts = TextOptions::default()
        .set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(EN_STEM)
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        )
        .set_stored();

    let key = builder.add_text_field(fields::KEY, STRING | STORED);
    let name = builder.add_text_field(fields::NAME, text_opts.clone());
    let city = builder.add_text_field(fields::CITY, text_opts.clone());
    let zip = builder.add_text_field(fields::ZIP, STRING | STORED);
    let country = builder.add_text_field(fields::COUNTRY, text_opts.clone());
    let address = builder.add_text_field(fields::ADDRESS, text_opts.clone());
    let location = builder.add_text_field(fields::LOCATION, text_opts);

    let schema = builder.build();
    let fields = SchemaFields {
        key,
        name,
        city,
        zip,
        country,
        address,
        location,
    };

    (schema, fields)
}

pub fn register_tokenizers(index: &Index) {
    let en_stem = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(40))
        .filter(LowerCaser)
        .filter(Stemmer::new(tantivy::tokenizer::Language::English))
        .build();
    index.tokenizers().register(EN_STEM, en_stem);
}

pub fn extract_text(doc: &TantivyDocument, field: Field) -> String {
    doc.get_first(field)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}
