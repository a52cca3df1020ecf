//! Builders for test fixtures.

#![allow(dead_code)]

use inkflow::brand::{ImageDefaults, NewBrand, SitemapPage, VoiceProfile};
use inkflow::content::{Brief, ImageSuggestion, OutlineSection};

/// A brand whose image defaults plan exactly `1 + sections` images
/// (hero plus one per brief suggestion, up to four).
pub fn garden_brand() -> NewBrand {
    NewBrand {
        name: "Acme Gardens".to_string(),
        domain: Some("acme-gardens.test".to_string()),
        voice: VoiceProfile {
            tone: "friendly".to_string(),
            audience: Some("home gardeners".to_string()),
            guidelines: vec!["Use short paragraphs".to_string()],
        },
        image_defaults: ImageDefaults {
            max_images: 4,
            include_hero: true,
            ..Default::default()
        },
        sitemap_pages: vec![SitemapPage {
            url: "https://acme-gardens.test/guides/soil".to_string(),
            title: "Soil guide".to_string(),
            summary: None,
        }],
        ..NewBrand::new("Acme Gardens")
    }
}

/// Brief for `topic` with image suggestions for each of `sections`.
pub fn brief_for(topic: &str, sections: &[&str]) -> Brief {
    Brief {
        topic: topic.to_string(),
        summary: format!("Everything about {}", topic),
        key_points: vec!["Start small".to_string()],
        outline: sections
            .iter()
            .map(|s| OutlineSection {
                heading: s.to_string(),
                notes: Vec::new(),
            })
            .collect(),
        sources: Vec::new(),
        image_suggestions: sections
            .iter()
            .map(|s| ImageSuggestion {
                placement: s.to_string(),
                description: format!("Illustration for {}", s),
            })
            .collect(),
    }
}

/// The sections every scripted brief carries: with the hero that makes
/// four planned images.
pub const SECTIONS: &[&str] = &["intro", "tools", "troubleshooting"];
