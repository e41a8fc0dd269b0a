//! Rule tables mapping community tags onto the Radvorrangsnetz schema

use log::warn;

use super::AttributeTranslator;
use super::signs::has_traffic_sign;
use super::width::parse_width;
use crate::model::{AttrValue, Attributes, SourceKind, SourceWay, text_of};

/// Prefix of values that need manual clarification
pub const UNRESOLVED: &str = "[offen]";

pub const KEY_DIRECTION: &str = "verkehrsri";
pub const KEY_GUIDANCE: &str = "fuehr";
pub const KEY_MANDATORY: &str = "pflicht";
pub const KEY_WIDTH: &str = "breite";
pub const KEY_SURFACE: &str = "ofm";
pub const KEY_COLOUR: &str = "farbe";
pub const KEY_PROTECTION: &str = "protek";
pub const KEY_SAFETY_STRIP: &str = "trennstreifen";
pub const KEY_RESTRICTION: &str = "nutz_beschr";

/// Prefix for raw source attributes carried along
pub const CARRY_PREFIX: &str = "tilda_";

const ONE_WAY: &str = "Einrichtungsverkehr";
const TWO_WAY: &str = "Zweirichtungsverkehr";

pub const DAMAGE_SIGN: &str =
    "Schadensschild/StVO Zusatzeichen (Straßenschäden, Gehwegschäden, Radwegschäden)";
pub const NO_RESTRICTION: &str = "keine";

const MANDATORY_SIGNS: [&str; 3] = ["237", "240", "241"];
const DAMAGE_TEXTS: [&str; 3] = ["Gehwegschäden", "Radwegschäden", "Geh- und Radwegschäden"];

const SURFACE_TABLE: &[(&str, &str)] = &[
    ("asphalt", "Asphalt"),
    ("concrete", "Beton (Platte etc.)"),
    ("concrete:plates", "Beton (Platte etc.)"),
    ("concrete:lanes", "Beton (Platte etc.)"),
    ("paving_stones", "Gepflastert (Berliner Platte, Mosaik, Kleinstein...)"),
    ("mosaic_sett", "Gepflastert (Berliner Platte, Mosaik, Kleinstein...)"),
    ("small_sett", "Gepflastert (Berliner Platte, Mosaik, Kleinstein...)"),
    ("large_sett", "Gepflastert (Berliner Platte, Mosaik, Kleinstein...)"),
    ("sett", "Kopfsteinpflaster / Großstein"),
    ("cobblestone", "Kopfsteinpflaster / Großstein"),
    ("bricks", "Kopfsteinpflaster / Großstein"),
    ("stone", "Kopfsteinpflaster / Großstein"),
    ("unpaved", "Ungebunden"),
    ("ground", "Ungebunden"),
    ("grass", "Ungebunden"),
    ("sand", "Ungebunden"),
    ("compacted", "Ungebunden"),
    ("fine_gravel", "Ungebunden"),
    ("pebblestone", "Ungebunden"),
    ("gravel", "Ungebunden"),
];

const UNMAPPABLE_SURFACES: [&str; 4] = ["grass_paver", "wood", "metal", "paved"];

const SEPARATION_TABLE: &[(&str, &str)] = &[
    ("bollard", "Poller (auf Sperrfläche)"),
    ("bump", "Schwellen (auf Sperrfläche)"),
    (
        "vertical_panel",
        "Leitboys (flexibel, auf Breitstrich, ohne Sperrfläche)",
    ),
    ("planter", "Sonstige (z.B. Pflanzkübel, Leitplanke)"),
    ("guard_rail", "Sonstige (z.B. Pflanzkübel, Leitplanke)"),
    ("no", "Ohne"),
];

/// Translator into the Radvorrangsnetz attribute set
#[derive(Debug, Clone, Default)]
pub struct RvnTranslator {
    /// Raw keys copied as `tilda_<key>`
    pub carry: Vec<String>,
}

impl RvnTranslator {
    pub fn new(carry: Vec<String>) -> Self {
        Self { carry }
    }
}

impl AttributeTranslator for RvnTranslator {
    fn translate(&self, way: &SourceWay) -> Attributes {
        let tags = way.attributes();
        let mut out = Attributes::new();

        out.insert(KEY_DIRECTION.into(), direction(way).into());
        out.insert(KEY_GUIDANCE.into(), guidance(way).into());
        out.insert(KEY_MANDATORY.into(), mandatory_use(way).into());
        out.insert(
            KEY_WIDTH.into(),
            tags.get("width").and_then(parse_width).into(),
        );
        out.insert(KEY_SURFACE.into(), surface(tags).into());
        out.insert(KEY_COLOUR.into(), coloured(tags).into());
        out.insert(KEY_PROTECTION.into(), protection(tags).into());
        out.insert(KEY_SAFETY_STRIP.into(), safety_strip(tags).into());
        out.insert(KEY_RESTRICTION.into(), restriction(tags).into());

        for key in &self.carry {
            if let Some(value) = tags.get(key) {
                out.insert(format!("{CARRY_PREFIX}{key}"), value.clone());
            }
        }
        out
    }
}

fn tag(tags: &Attributes, key: &str) -> String {
    text_of(tags, key).unwrap_or_default()
}

fn lower_tag(tags: &Attributes, key: &str) -> String {
    tag(tags, key).to_lowercase()
}

fn is_missing(value: &str) -> bool {
    matches!(value, "" | "None" | "none" | "nil" | "nan")
}

fn unresolved(reason: &str) -> String {
    format!("{UNRESOLVED} {reason}")
}

/// `verkehrsri`: direction of bicycle traffic
pub fn direction(way: &SourceWay) -> String {
    let tags = way.attributes();
    let oneway = tag(tags, "oneway");
    let oneway_bicycle = tag(tags, "oneway_bicycle");

    match way.kind {
        SourceKind::Bikelane => match oneway.as_str() {
            "yes" => ONE_WAY.to_string(),
            "no" | "car_not_bike" => TWO_WAY.to_string(),
            "assumed_no" => unresolved("Vermutlich Zweirichtungsverkehr"),
            "implicit_yes" => unresolved("Vermutlich Einrichtungsverkehr"),
            value if is_missing(value) => unresolved("Fehlender Wert"),
            value => {
                warn!("Unknown oneway value '{value}' on bikelane {}", way.id);
                unresolved("Fehlerhafter Wert")
            }
        },
        SourceKind::Street | SourceKind::Path => {
            if is_missing(&oneway) || oneway_bicycle == "no" {
                return TWO_WAY.to_string();
            }
            match oneway.as_str() {
                "yes" | "yes_dual_carriageway" => ONE_WAY.to_string(),
                "no" => TWO_WAY.to_string(),
                value => {
                    warn!("Unknown oneway value '{value}' on {} {}", way.kind, way.id);
                    unresolved("Fehlerhafter Wert")
                }
            }
        }
    }
}

/// `fuehr`: kind of cycling infrastructure
pub fn guidance(way: &SourceWay) -> String {
    match way.kind {
        SourceKind::Street => return "Mischverkehr mit motorisiertem Verkehr".to_string(),
        SourceKind::Path => {
            return "Sonstige Wege (Gehwege, Wege durch Grünflächen, Plätze)".to_string();
        }
        SourceKind::Bikelane => {}
    }

    let tags = way.attributes();
    let category = tag(tags, "category");
    let signs = tag(tags, "traffic_sign");
    let category = category.as_str();

    let value = match category {
        "cyclewayOnHighway_exclusive" | "cyclewayOnHighwayBetweenLanes" => "Radfahrstreifen",
        "sharedBusLaneBikeWithBus" => "Radfahrstreifen mit Linienverkehr frei (Z237 mit Z1026-32)",
        "cyclewayOnHighwayProtected" => "Geschützter Radfahrstreifen",
        "cyclewayOnHighway_advisory" => "Schutzstreifen",
        "bicycleRoad" | "bicycleRoad_vehicleDestination" => "Fahrradstraße /-zone (Z 244)",
        c if [
            "footAndCyclewayShared",
            "footAndCyclewaySegregated",
            "cyclewaySeparated",
            "cycleway_adjoining",
        ]
        .iter()
        .any(|prefix| c.starts_with(prefix)) =>
        {
            if c.starts_with("footAndCyclewayShared") && has_traffic_sign(&signs, "240") {
                "Gemeinsamer Geh- und Radweg mit Z240"
            } else {
                "Radweg"
            }
        }
        c if c.starts_with("footwayBicycleYes") => {
            if has_traffic_sign(&signs, "239") && has_traffic_sign(&signs, "1022-10") {
                "Gehweg mit Zusatzzeichen \"Radverkehr frei\" (Z239 mit Z1022-10)"
            } else if is_missing(&signs) {
                "Sonstige Wege (Gehwege, Wege durch Grünflächen, Plätze)"
            } else {
                return unresolved("Gehweg ohne Verkehrszeichen");
            }
        }
        "pedestrianAreaBicycleYes"
            if (has_traffic_sign(&signs, "242") || has_traffic_sign(&signs, "242.1"))
                && has_traffic_sign(&signs, "1022-10") =>
        {
            "Fußgängerzone \"Radverkehr frei\" (Z242 mit Z1022-10)"
        }
        "crossing" => return unresolved("Kreuzungs-Querung"),
        "needsClarification" => return unresolved("Klärung notwendig"),
        other => {
            warn!(
                "No guidance rule for category '{other}' (traffic_sign '{signs}') on way {}",
                way.id
            );
            return unresolved("Führung fehlt");
        }
    };
    value.to_string()
}

/// `pflicht`: mandatory use signposted
pub fn mandatory_use(way: &SourceWay) -> bool {
    if way.kind != SourceKind::Bikelane {
        return false;
    }
    let signs = tag(way.attributes(), "traffic_sign");
    MANDATORY_SIGNS
        .iter()
        .any(|sign| has_traffic_sign(&signs, sign))
}

/// `ofm`: surface class
pub fn surface(tags: &Attributes) -> String {
    let surface = lower_tag(tags, "surface");
    if surface.is_empty() || surface == "nan" {
        return unresolved("Oberfläche fehlt");
    }
    if let Some((_, class)) = SURFACE_TABLE.iter().find(|(key, _)| *key == surface) {
        return (*class).to_string();
    }
    if UNMAPPABLE_SURFACES.contains(&surface.as_str()) {
        return unresolved("Nicht zuordenbar");
    }
    if surface == "none" {
        return unresolved("Oberfläche fehlt");
    }
    warn!("Unknown surface value '{surface}'");
    unresolved("Unbekannte Oberfläche")
}

/// `farbe`: continuous red or green colouring
pub fn coloured(tags: &Attributes) -> bool {
    matches!(lower_tag(tags, "surface_color").as_str(), "red" | "green")
}

/// `protek`: physical protection, only for protected cycle lanes
pub fn protection(tags: &Attributes) -> String {
    if tag(tags, "category") != "cyclewayOnHighwayProtected" {
        return "Ohne".to_string();
    }

    for side in ["left", "right"] {
        let separation = Some(lower_tag(tags, &format!("separation_{side}")))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| lower_tag(tags, "separation"));
        let traffic_mode = lower_tag(tags, &format!("traffic_mode_{side}"));
        let markings = Some(lower_tag(tags, &format!("marking_{side}")))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| lower_tag(tags, "marking"));

        if traffic_mode == "parking" && markings.contains("barred_area") {
            return "Ruhender Verkehr (mit Sperrfläche)".to_string();
        }
        if let Some((_, class)) = SEPARATION_TABLE.iter().find(|(key, _)| *key == separation) {
            return (*class).to_string();
        }
        if markings.contains("barred_area") && separation == "no" {
            return "nur Sperrfläche".to_string();
        }
    }
    unresolved("Protektionstyp fehlt")
}

/// `trennstreifen`: safety strip towards parked cars
pub fn safety_strip(tags: &Attributes) -> String {
    let category = lower_tag(tags, "category");
    let parking = |side: &str| lower_tag(tags, &format!("traffic_mode_{side}")) == "parking";

    if category.starts_with("bicycleroad") {
        for side in ["left", "right"] {
            let markings = lower_tag(tags, &format!("marking_{side}"));
            if parking(side) && (markings.contains("dashed_line") || markings.contains("solid_line"))
            {
                return "ja".to_string();
            }
        }
        if !parking("left") && !parking("right") {
            return "entfällt".to_string();
        }
        return "nein".to_string();
    }

    if !parking("right") {
        return "entfällt".to_string();
    }
    let buffer = tags.get("buffer_right").and_then(|value| match value {
        AttrValue::Text(text) => text.trim().parse::<f64>().ok(),
        other => other.as_f64(),
    });
    if buffer.is_some_and(|b| b >= 0.6) {
        "ja".to_string()
    } else {
        "nein".to_string()
    }
}

/// `nutz_beschr`: usage restriction due to damage
pub fn restriction(tags: &Attributes) -> String {
    let signs = tag(tags, "traffic_sign");
    if DAMAGE_TEXTS.iter().any(|text| signs.contains(text)) {
        DAMAGE_SIGN.to_string()
    } else {
        NO_RESTRICTION.to_string()
    }
}

#[cfg(test)]
mod tests {
    use geo::line_string;

    use super::*;
    use crate::model::LinearFeature;

    fn way(kind: SourceKind, tags: &[(&str, &str)]) -> SourceWay {
        let attributes = tags
            .iter()
            .map(|(k, v)| ((*k).to_string(), AttrValue::from(*v)))
            .collect();
        SourceWay::new(
            "w1",
            kind,
            LinearFeature::new(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)], attributes),
        )
    }

    #[test]
    fn bikelane_direction_rules() {
        assert_eq!(direction(&way(SourceKind::Bikelane, &[("oneway", "yes")])), ONE_WAY);
        assert_eq!(
            direction(&way(SourceKind::Bikelane, &[("oneway", "car_not_bike")])),
            TWO_WAY
        );
        assert!(direction(&way(SourceKind::Bikelane, &[])).starts_with(UNRESOLVED));
    }

    #[test]
    fn street_direction_honours_bicycle_exception() {
        let street = way(
            SourceKind::Street,
            &[("oneway", "yes"), ("oneway_bicycle", "no")],
        );
        assert_eq!(direction(&street), TWO_WAY);
        assert_eq!(
            direction(&way(SourceKind::Street, &[("oneway", "yes_dual_carriageway")])),
            ONE_WAY
        );
        assert_eq!(direction(&way(SourceKind::Path, &[])), TWO_WAY);
    }

    #[test]
    fn guidance_from_category_and_signs() {
        let shared = way(
            SourceKind::Bikelane,
            &[("category", "footAndCyclewayShared_isolated"), ("traffic_sign", "DE:240")],
        );
        assert_eq!(guidance(&shared), "Gemeinsamer Geh- und Radweg mit Z240");

        let separated = way(SourceKind::Bikelane, &[("category", "cyclewaySeparated_isolated")]);
        assert_eq!(guidance(&separated), "Radweg");

        let footway = way(
            SourceKind::Bikelane,
            &[("category", "footwayBicycleYes_adjoining"), ("traffic_sign", "DE:239,1022-10")],
        );
        assert!(guidance(&footway).starts_with("Gehweg mit Zusatzzeichen"));

        assert_eq!(
            guidance(&way(SourceKind::Street, &[("category", "anything")])),
            "Mischverkehr mit motorisiertem Verkehr"
        );
        assert!(guidance(&way(SourceKind::Bikelane, &[("category", "crossing")])).starts_with(UNRESOLVED));
    }

    #[test]
    fn mandatory_use_only_for_bikelanes() {
        let tags = [("traffic_sign", "DE:237")];
        assert!(mandatory_use(&way(SourceKind::Bikelane, &tags)));
        assert!(!mandatory_use(&way(SourceKind::Street, &tags)));
    }

    #[test]
    fn surface_table() {
        let tags = |s: &str| way(SourceKind::Path, &[("surface", s)]).feature.attributes;
        assert_eq!(surface(&tags("asphalt")), "Asphalt");
        assert_eq!(surface(&tags("Concrete:plates")), "Beton (Platte etc.)");
        assert_eq!(surface(&tags("gravel")), "Ungebunden");
        assert!(surface(&tags("wood")).starts_with(UNRESOLVED));
        assert!(surface(&Attributes::new()).starts_with(UNRESOLVED));
    }

    #[test]
    fn protection_only_for_protected_lanes() {
        let protected = way(
            SourceKind::Bikelane,
            &[("category", "cyclewayOnHighwayProtected"), ("separation_left", "bollard")],
        );
        assert_eq!(protection(protected.attributes()), "Poller (auf Sperrfläche)");

        let parked = way(
            SourceKind::Bikelane,
            &[
                ("category", "cyclewayOnHighwayProtected"),
                ("traffic_mode_left", "parking"),
                ("marking_left", "barred_area"),
            ],
        );
        assert_eq!(protection(parked.attributes()), "Ruhender Verkehr (mit Sperrfläche)");

        let plain = way(SourceKind::Bikelane, &[("category", "cyclewayOnHighway_exclusive")]);
        assert_eq!(protection(plain.attributes()), "Ohne");
    }

    #[test]
    fn safety_strip_rules() {
        let strip = |tags: &[(&str, &str)]| safety_strip(way(SourceKind::Bikelane, tags).attributes());
        assert_eq!(strip(&[]), "entfällt");
        assert_eq!(strip(&[("traffic_mode_right", "parking"), ("buffer_right", "0.75")]), "ja");
        assert_eq!(strip(&[("traffic_mode_right", "parking"), ("buffer_right", "0.3")]), "nein");
        assert_eq!(
            strip(&[
                ("category", "bicycleRoad"),
                ("traffic_mode_left", "parking"),
                ("marking_left", "dashed_line"),
            ]),
            "ja"
        );
    }

    #[test]
    fn damage_signs_restrict_use() {
        let damaged = way(SourceKind::Bikelane, &[("traffic_sign", "DE:1052-36,Radwegschäden")]);
        assert_eq!(restriction(damaged.attributes()), DAMAGE_SIGN);
        assert_eq!(restriction(&Attributes::new()), NO_RESTRICTION);
    }

    #[test]
    fn carries_requested_raw_keys() {
        let translator = RvnTranslator::new(vec!["name".to_string()]);
        let attrs = translator.translate(&way(
            SourceKind::Bikelane,
            &[("name", "Sonnenallee"), ("oneway", "yes"), ("width", "2.04")],
        ));
        assert_eq!(attrs.get("tilda_name"), Some(&AttrValue::from("Sonnenallee")));
        assert_eq!(attrs.get(KEY_WIDTH), Some(&AttrValue::Float(2.0)));
        assert_eq!(attrs.get(KEY_MANDATORY), Some(&AttrValue::Bool(false)));
        assert!(!attrs.contains_key("tilda_oneway"));
    }
}
