//! Static record schemas, one per entity kind.
//!
//! Each schema fixes the target table, the expected field count of a raw row
//! and the coercion applied to every column. Schemas are resolved from the
//! [`EntityKind`] through a `match`, never by name lookup.

use crate::{Coercion, EntityKind};

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Character data.
    Text,
    /// Signed 64-bit integer.
    Integer,
    /// Double precision float.
    Real,
    /// Calendar date.
    Date,
}

/// One column of a [`RecordSchema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Column name, shared by the record key and the table column.
    pub name: &'static str,
    /// Coercion applied to the raw field.
    pub coercion: Coercion,
}

impl Column {
    const fn new(name: &'static str, coercion: Coercion) -> Self {
        Self { name, coercion }
    }

    /// Storage type implied by the coercion.
    #[must_use]
    pub const fn column_type(&self) -> ColumnType {
        match self.coercion {
            Coercion::Integer => ColumnType::Integer,
            Coercion::Float => ColumnType::Real,
            Coercion::Date => ColumnType::Date,
            Coercion::Text | Coercion::Digits | Coercion::PostalCode | Coercion::StateCode => {
                ColumnType::Text
            }
        }
    }
}

/// How rows of a table are keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryKey {
    /// A generated integer `id` column not present in the source data.
    Surrogate,
    /// The named source column.
    Column(&'static str),
}

/// Table layout for one entity kind.
#[derive(Debug, PartialEq, Eq)]
pub struct RecordSchema {
    /// Entity kind described by the schema.
    pub entity_kind: EntityKind,
    /// Destination table name.
    pub table: &'static str,
    /// Columns in source field order.
    pub columns: &'static [Column],
    /// Key of the destination table.
    pub primary_key: PrimaryKey,
}

impl RecordSchema {
    /// Schema for `kind`.
    ///
    /// # Examples
    ///
    /// ```
    /// use cnpj_core::{EntityKind, RecordSchema};
    ///
    /// let schema = RecordSchema::for_kind(EntityKind::Estabelecimento);
    /// assert_eq!(schema.table, "estabelecimentos");
    /// assert_eq!(schema.column_count(), 30);
    /// ```
    #[must_use]
    pub const fn for_kind(kind: EntityKind) -> &'static Self {
        match kind {
            EntityKind::Cnae => &CNAE,
            EntityKind::MotivoCadastral => &MOTIVO_CADASTRAL,
            EntityKind::Municipio => &MUNICIPIO,
            EntityKind::Natureza => &NATUREZA,
            EntityKind::Pais => &PAIS,
            EntityKind::Qualificacao => &QUALIFICACAO,
            EntityKind::DadoSimples => &DADO_SIMPLES,
            EntityKind::Socio => &SOCIO,
            EntityKind::Empresa => &EMPRESA,
            EntityKind::Estabelecimento => &ESTABELECIMENTO,
        }
    }

    /// Number of fields every raw row of this kind must carry.
    #[must_use]
    pub const fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Position of `name` among the columns.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    /// Column names in source order.
    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|column| column.name)
    }
}

use Coercion::{Date, Digits, Float, Integer, PostalCode, StateCode, Text};

const fn reference(
    entity_kind: EntityKind,
    table: &'static str,
    columns: &'static [Column],
) -> RecordSchema {
    RecordSchema {
        entity_kind,
        table,
        columns,
        primary_key: PrimaryKey::Column("codigo"),
    }
}

const fn facts(
    entity_kind: EntityKind,
    table: &'static str,
    columns: &'static [Column],
) -> RecordSchema {
    RecordSchema {
        entity_kind,
        table,
        columns,
        primary_key: PrimaryKey::Surrogate,
    }
}

const TEXT_CODE: &[Column] = &[Column::new("codigo", Text), Column::new("descricao", Text)];
const INTEGER_CODE: &[Column] = &[
    Column::new("codigo", Integer),
    Column::new("descricao", Text),
];

static CNAE: RecordSchema = reference(EntityKind::Cnae, "cnaes", TEXT_CODE);
static MOTIVO_CADASTRAL: RecordSchema =
    reference(EntityKind::MotivoCadastral, "motivo_cadastral", INTEGER_CODE);
static MUNICIPIO: RecordSchema = reference(EntityKind::Municipio, "municipio", TEXT_CODE);
static NATUREZA: RecordSchema = reference(EntityKind::Natureza, "naturezas", INTEGER_CODE);
static PAIS: RecordSchema = reference(EntityKind::Pais, "paises", INTEGER_CODE);
static QUALIFICACAO: RecordSchema =
    reference(EntityKind::Qualificacao, "qualificacoes", INTEGER_CODE);

const DADO_SIMPLES_COLUMNS: &[Column] = &[
    Column::new("cnpj", Text),
    Column::new("opcao_simples", Text),
    Column::new("data_opcao_simples", Date),
    Column::new("data_exclusao_simples", Date),
    Column::new("opcao_mei", Text),
    Column::new("data_opcao_mei", Date),
    Column::new("data_exclusao_mei", Date),
];
static DADO_SIMPLES: RecordSchema =
    facts(EntityKind::DadoSimples, "dados_simples", DADO_SIMPLES_COLUMNS);

const SOCIO_COLUMNS: &[Column] = &[
    Column::new("cnpj", Text),
    Column::new("identificador_socio", Integer),
    Column::new("nome", Text),
    Column::new("cpf_cnpj", Text),
    Column::new("qualificacao", Integer),
    Column::new("data_entrada_sociedade", Date),
    Column::new("codigo_pais", Integer),
    Column::new("cpf_representante_legal", Text),
    Column::new("nome_representante_legal", Text),
    Column::new("qualificacao_representante_legal", Integer),
    Column::new("faixa_etaria", Integer),
];
static SOCIO: RecordSchema = facts(EntityKind::Socio, "socios", SOCIO_COLUMNS);

const EMPRESA_COLUMNS: &[Column] = &[
    Column::new("cnpj", Text),
    Column::new("razao_social", Text),
    Column::new("natureza_juridica", Integer),
    Column::new("qualificacao_responsavel", Integer),
    Column::new("capital_social", Float),
    Column::new("porte", Integer),
    Column::new("ente_federativo", Text),
];
static EMPRESA: RecordSchema = facts(EntityKind::Empresa, "empresas", EMPRESA_COLUMNS);

const ESTABELECIMENTO_COLUMNS: &[Column] = &[
    Column::new("cnpj", Text),
    Column::new("cnpj_ordem", Text),
    Column::new("cnpj_dv", Text),
    Column::new("matriz_filial", Integer),
    Column::new("nome_fantasia", Text),
    Column::new("situacao_cadastral", Integer),
    Column::new("data_situacao_cadastral", Date),
    Column::new("motivo_situacao_cadastral", Integer),
    Column::new("cidade_exterior", Text),
    Column::new("pais", Integer),
    Column::new("data_inicio_atividade", Date),
    Column::new("cnae_fiscal", Text),
    Column::new("cnae_secundario", Text),
    Column::new("tipo_logradouro", Text),
    Column::new("logradouro", Text),
    Column::new("numero", Text),
    Column::new("complemento", Text),
    Column::new("bairro", Text),
    Column::new("cep", PostalCode),
    Column::new("uf", StateCode),
    Column::new("municipio", Integer),
    Column::new("ddd_1", Integer),
    Column::new("telefone_1", Digits),
    Column::new("ddd_2", Integer),
    Column::new("telefone_2", Digits),
    Column::new("ddd_fax", Integer),
    Column::new("fax", Digits),
    Column::new("email", Text),
    Column::new("situacao_especial", Text),
    Column::new("data_situacao_especial", Date),
];
static ESTABELECIMENTO: RecordSchema = facts(
    EntityKind::Estabelecimento,
    "estabelecimentos",
    ESTABELECIMENTO_COLUMNS,
);
