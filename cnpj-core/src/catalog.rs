//! The catalog of published entity kinds and their archive name prefixes.

use std::{fmt, str::FromStr};

use thiserror::Error;

/// One category of records published in the CNPJ open-data release.
///
/// Variants are declared in catalog order: reference tables first, then the
/// large fact tables. Discovery and sequential loading both follow this order.
///
/// # Examples
///
/// ```
/// use cnpj_core::EntityKind;
///
/// let kind: EntityKind = "estabelecimento".parse().expect("known kind");
/// assert_eq!(kind.archive_prefix(), "Estabelecimentos");
/// assert!(kind.matches_archive("Estabelecimentos3.zip"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum EntityKind {
    /// National economic activity classification codes.
    Cnae,
    /// Reasons for a registration status change.
    MotivoCadastral,
    /// Municipality codes.
    Municipio,
    /// Legal nature codes.
    Natureza,
    /// Country codes.
    Pais,
    /// Partner and representative qualification codes.
    Qualificacao,
    /// Simplified tax regime options.
    DadoSimples,
    /// Company partners.
    Socio,
    /// Companies, keyed by the CNPJ root.
    Empresa,
    /// Establishments, one per full CNPJ.
    Estabelecimento,
}

impl EntityKind {
    /// Every entity kind in catalog order.
    pub const ALL: [Self; 10] = [
        Self::Cnae,
        Self::MotivoCadastral,
        Self::Municipio,
        Self::Natureza,
        Self::Pais,
        Self::Qualificacao,
        Self::DadoSimples,
        Self::Socio,
        Self::Empresa,
        Self::Estabelecimento,
    ];

    /// Snake-case identifier used in configuration and logs.
    #[must_use]
    pub const fn identifier(self) -> &'static str {
        match self {
            Self::Cnae => "cnae",
            Self::MotivoCadastral => "motivo_cadastral",
            Self::Municipio => "municipio",
            Self::Natureza => "natureza",
            Self::Pais => "pais",
            Self::Qualificacao => "qualificacao",
            Self::DadoSimples => "dado_simples",
            Self::Socio => "socio",
            Self::Empresa => "empresa",
            Self::Estabelecimento => "estabelecimento",
        }
    }

    /// File name prefix the publisher uses for this kind's archives.
    #[must_use]
    pub const fn archive_prefix(self) -> &'static str {
        match self {
            Self::Cnae => "Cnaes",
            Self::MotivoCadastral => "Motivos",
            Self::Municipio => "Municipios",
            Self::Natureza => "Naturezas",
            Self::Pais => "Paises",
            Self::Qualificacao => "Qualificacoes",
            Self::DadoSimples => "Simples",
            Self::Socio => "Socios",
            Self::Empresa => "Empresas",
            Self::Estabelecimento => "Estabelecimentos",
        }
    }

    /// Whether `file_name` names one of this kind's ZIP archives.
    #[must_use]
    pub fn matches_archive(self, file_name: &str) -> bool {
        file_name.starts_with(self.archive_prefix())
            && file_name.to_ascii_lowercase().ends_with(".zip")
    }

    /// Find the kind whose prefix matches `file_name`, if any.
    #[must_use]
    pub fn for_archive(file_name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.matches_archive(file_name))
    }

    /// Upper-cased identifier used to tag log lines.
    #[must_use]
    pub fn label(self) -> String {
        self.identifier().to_ascii_uppercase()
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// Error returned when parsing an unknown entity kind identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown entity kind {identifier:?}")]
pub struct UnknownEntityKind {
    /// Identifier that failed to parse.
    pub identifier: String,
}

impl FromStr for EntityKind {
    type Err = UnknownEntityKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.identifier().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownEntityKind {
                identifier: value.to_owned(),
            })
    }
}
