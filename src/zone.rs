//! Display zones - the named page regions that own rendered media records.
//!
//! Zone tags arrive from the store in several historical spellings
//! (Portuguese and English aliases from older dashboard versions), so tag
//! parsing normalizes all known aliases to the four canonical zones.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A named display region of the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    /// Page banner; renders only the single newest record as a background
    Hero,
    /// Service cards grid
    Services,
    /// Cut/style gallery grid
    Gallery,
    /// Team carousel with indicator list
    Team,
}

impl Zone {
    /// All zones, in the order containers are resolved at startup
    pub const ALL: [Zone; 4] = [Zone::Hero, Zone::Services, Zone::Gallery, Zone::Team];

    /// Canonical tag string
    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Hero => "hero",
            Zone::Services => "services",
            Zone::Gallery => "gallery",
            Zone::Team => "team",
        }
    }

    /// Parse a zone tag, normalizing known legacy aliases.
    ///
    /// Returns `None` for unknown tags so classification can fall through
    /// to the title keyword heuristic.
    pub fn from_tag(tag: &str) -> Option<Zone> {
        match tag.trim().to_lowercase().as_str() {
            "hero" | "banner" => Some(Zone::Hero),
            "services" | "servicos" | "serviços" => Some(Zone::Services),
            "gallery" | "galeria" | "cortes" | "portfolio" => Some(Zone::Gallery),
            "team" | "equipe" | "sobre" => Some(Zone::Team),
            _ => None,
        }
    }

    /// Zone-specific rendering behavior flags and display fallbacks
    pub fn behavior(&self) -> &'static ZoneBehavior {
        match self {
            Zone::Hero => &ZoneBehavior {
                single_newest: true,
                carousel: false,
                placeholder_title: "Destaque",
                placeholder_description: "Imagem de destaque",
            },
            Zone::Services => &ZoneBehavior {
                single_newest: false,
                carousel: false,
                placeholder_title: "Serviço",
                placeholder_description: "Atendimento especializado",
            },
            Zone::Gallery => &ZoneBehavior {
                single_newest: false,
                carousel: false,
                placeholder_title: "Corte Profissional",
                placeholder_description: "Estilo único e personalizado",
            },
            Zone::Team => &ZoneBehavior {
                single_newest: false,
                carousel: true,
                placeholder_title: "Equipe",
                placeholder_description: "Profissional qualificado",
            },
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-zone rendering flags and placeholder strings used when a record
/// carries no title or description.
#[derive(Debug)]
pub struct ZoneBehavior {
    /// Render only the single newest active record (hero background)
    pub single_newest: bool,
    /// Maintain a parallel indicator list sized to the slide count (team)
    pub carousel: bool,
    pub placeholder_title: &'static str,
    pub placeholder_description: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_tags_round_trip() {
        for zone in Zone::ALL {
            assert_eq!(Zone::from_tag(zone.as_str()), Some(zone));
        }
    }

    #[test]
    fn test_legacy_aliases() {
        assert_eq!(Zone::from_tag("banner"), Some(Zone::Hero));
        assert_eq!(Zone::from_tag("servicos"), Some(Zone::Services));
        assert_eq!(Zone::from_tag("galeria"), Some(Zone::Gallery));
        assert_eq!(Zone::from_tag("cortes"), Some(Zone::Gallery));
        assert_eq!(Zone::from_tag("equipe"), Some(Zone::Team));
        assert_eq!(Zone::from_tag("sobre"), Some(Zone::Team));
        assert_eq!(Zone::from_tag(" Equipe "), Some(Zone::Team));
    }

    #[test]
    fn test_unknown_tag_is_none() {
        assert_eq!(Zone::from_tag("instalacoes"), None);
        assert_eq!(Zone::from_tag(""), None);
    }

    #[test]
    fn test_behavior_flags() {
        assert!(Zone::Hero.behavior().single_newest);
        assert!(Zone::Team.behavior().carousel);
        assert!(!Zone::Gallery.behavior().single_newest);
        assert!(!Zone::Services.behavior().carousel);
    }
}
