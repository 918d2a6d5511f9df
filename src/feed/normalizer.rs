use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::common::error::{ImportError, Result};
use crate::feed::model::{FeedNode, FieldValue};

/// One row of the `imoveis` table, fully coerced and validated.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedListing {
    pub descricao: Option<String>,
    pub tipo: String,
    pub finalidade: String,
    pub qtd_quartos: i32,
    pub qtd_banheiros: i32,
    pub qtd_vagas: i32,
    pub preco: f64,
    pub area_imovel: f64,
    pub link: Option<String>,
    pub bairro: String,
    pub cidade: String,
    pub referencia: Option<String>,
}

/// Feed category → domain label. Advisory: categories not in the table pass
/// through unchanged, so extending it is a one-line change.
static PROPERTY_TYPES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("Residential / Apartment", "Apartamento"),
        ("Residential / Home", "Casa"),
        ("Residential / Land Lot", "Terreno"),
        ("Residential / Farm Ranch", "Chácara"),
        ("Commercial / Office", "Sala Comercial"),
        ("Commercial / Studio", "Studio"),
        ("Commercial / Agricultural", "Área Agrícola"),
        ("Commercial / Industrial", "Galpão Industrial"),
        ("Commercial / Edificio Comercial", "Edifício Comercial"),
    ])
});

// "2 vagas de garagem", "1 vaga garagem", case-insensitive.
static GARAGE_MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*vagas?\s*(?:de\s*)?garagem").unwrap());

pub fn map_property_type(raw: &str) -> &str {
    PROPERTY_TYPES.get(raw).copied().unwrap_or(raw)
}

pub fn map_transaction_type(raw: &str) -> &str {
    match raw {
        "For Sale" => "Venda",
        "For Rent" => "Aluguel",
        other => other,
    }
}

/// Best-effort parking count from free text. Only consulted when the
/// structured garage field yields 0; the feed routinely mentions the spots in
/// the title instead of filling the field.
pub fn parking_from_description(description: &str) -> Option<i32> {
    GARAGE_MENTION
        .captures(description)
        .and_then(|caps| caps.get(1))
        .and_then(|count| count.as_str().parse().ok())
}

/// Converts one raw listing into a row, or fails with a `MappingError` naming
/// the positional index. Numeric fields coerce leniently (scalar or
/// attributed shape, default 0); neighborhood and city are hard requirements
/// because a non-locatable listing is not a valid row.
pub fn normalize_listing(listing: &FeedNode, index: usize) -> Result<NormalizedListing> {
    let details = listing.child("Details");
    let location = listing.child("Location");

    let descricao = non_empty(listing.field("Title").text());

    let tipo = map_property_type(
        non_empty(field_of(details, "PropertyType").text()).unwrap_or_default().as_str(),
    )
    .to_uppercase();

    let finalidade = map_transaction_type(
        non_empty(listing.field("TransactionType").text()).unwrap_or_default().as_str(),
    )
    .to_uppercase();

    let qtd_quartos = field_of(details, "Bedrooms").count();
    let qtd_banheiros = field_of(details, "Bathrooms").count();

    let mut qtd_vagas = field_of(details, "Garage").count();
    if qtd_vagas == 0 {
        if let Some(desc) = &descricao {
            if let Some(spots) = parking_from_description(desc) {
                qtd_vagas = spots;
            }
        }
    }

    // Sale price wins over rental price; presence is decided per field, so a
    // priced-for-sale listing never falls back to its rental price even when
    // the sale price fails to parse.
    let list_price = field_of(details, "ListPrice");
    let rental_price = field_of(details, "RentalPrice");
    let preco = if list_price.is_present() {
        list_price.decimal()
    } else if rental_price.is_present() {
        rental_price.decimal()
    } else {
        0.0
    };

    let living_area = field_of(details, "LivingArea").decimal();
    let lot_area = field_of(details, "LotArea").decimal();
    let area_imovel = if living_area > 0.0 { living_area } else { lot_area };

    // The feed separates URL segments with '+'; the target system expects
    // '-'-delimited slugs.
    let link = non_empty(listing.field("DetailViewUrl").text()).map(|url| url.replace('+', "-"));

    let bairro = non_empty(field_of(location, "Neighborhood").text())
        .ok_or_else(|| ImportError::mapping(index, "listing has no neighborhood"))?
        .to_uppercase();
    let cidade = non_empty(field_of(location, "City").text())
        .ok_or_else(|| ImportError::mapping(index, "listing has no city"))?
        .to_uppercase();

    let referencia = non_empty(listing.field("ListingID").text());

    Ok(NormalizedListing {
        descricao,
        tipo,
        finalidade,
        qtd_quartos,
        qtd_banheiros,
        qtd_vagas,
        preco,
        area_imovel,
        link,
        bairro,
        cidade,
        referencia,
    })
}

/// Field lookup tolerating an absent parent block (`Details`, `Location`).
fn field_of<'a>(parent: Option<&'a FeedNode>, name: &str) -> FieldValue<'a> {
    parent.map_or(FieldValue::Absent, |node| node.field(name))
}

fn non_empty(text: Option<&str>) -> Option<String> {
    text.filter(|s| !s.is_empty()).map(String::from)
}
