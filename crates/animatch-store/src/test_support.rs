//! Fixtures shared by unit tests.

use animatch_core::{Embedding, Localized, PartnerCharacter, PrimaryCharacter, SnapshotHeader, WorkInfo};

use crate::source::SourceCharacter;

pub(crate) const DIM: usize = 4;

pub(crate) fn header() -> SnapshotHeader {
    SnapshotHeader {
        model_identifier: "ViT-B-32".into(),
        pretrained_tag: "openai".into(),
        embedding_dimension: DIM,
    }
}

/// Basis vector `e_axis`.
pub(crate) fn unit(axis: usize) -> Embedding {
    let mut v = vec![0.0; DIM];
    v[axis] = 1.0;
    Embedding::from_components(v)
}

pub(crate) fn character(id: i64, name: &str) -> SourceCharacter {
    SourceCharacter {
        work: WorkInfo {
            id: 1,
            title: Localized::new("work".into()),
            genres: Localized::new(vec!["drama".into()]),
            orientation: None,
            tier: 2,
        },
        primary: PrimaryCharacter {
            id: id - 1,
            name: Localized::new(format!("primary of {name}")),
            image: Some(format!("images/{}.png", id - 1)),
        },
        partner: PartnerCharacter {
            id,
            name: Localized::new(name.to_string()),
            tags: Localized::default(),
            traits: Localized::default(),
            appeal: Localized::default(),
            quote: Localized::default(),
            color: "#fff".into(),
            emoji: "💫".into(),
            image: None,
        },
    }
}
