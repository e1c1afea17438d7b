//! Test entities for the repository layer

use chrono::{DateTime, Utc};

use ck_core::{
    Entity, Id, Identifiable, ObjectShape, PropertyDescriptor, ScalarType, SoftDeletable, Value,
};

/// Soft-delete state carried by archivable documents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Archive {
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SoftDeletable for Archive {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    fn mark_deleted(&mut self, at: DateTime<Utc>) {
        self.deleted_at = Some(at);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Author {
    pub id: Option<Id>,
    pub name: String,
}

/// A document; only documents with an archive can be soft-deleted
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub id: Option<Id>,
    pub title: String,
    pub pages: i64,
    pub published: bool,
    pub author: Option<Author>,
    pub archive: Option<Archive>,
}

static AUTHOR_PROPERTIES: [PropertyDescriptor; 2] = [
    PropertyDescriptor::scalar("Id", ScalarType::Int).read_only(),
    PropertyDescriptor::text("Name"),
];

static DOCUMENT_PROPERTIES: [PropertyDescriptor; 6] = [
    PropertyDescriptor::scalar("Id", ScalarType::Int).read_only(),
    PropertyDescriptor::text("Title"),
    PropertyDescriptor::scalar("Pages", ScalarType::Int),
    PropertyDescriptor::scalar("Published", ScalarType::Bool),
    PropertyDescriptor::scalar("DeletedAt", ScalarType::DateTime),
    PropertyDescriptor::object("Author", AUTHOR_SHAPE),
];

fn author_properties() -> &'static [PropertyDescriptor] {
    &AUTHOR_PROPERTIES
}

const AUTHOR_SHAPE: ObjectShape = ObjectShape::entity("Author", author_properties);

impl Identifiable for Document {
    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Entity for Document {
    const TYPE_NAME: &'static str = "Document";
    const TABLE_NAME: &'static str = "documents";

    fn properties() -> &'static [PropertyDescriptor] {
        &DOCUMENT_PROPERTIES
    }

    fn property(&self, name: &str) -> Option<Value> {
        Some(match name {
            "Id" => Value::from(self.id),
            "Title" => Value::from(&self.title),
            "Pages" => Value::from(self.pages),
            "Published" => Value::from(self.published),
            "DeletedAt" => Value::from(self.archive.as_ref().and_then(|a| a.deleted_at)),
            "Author" => self.author.as_ref().map_or(Value::Null, |author| {
                Value::object([
                    ("Id", Value::from(author.id)),
                    ("Name", Value::from(&author.name)),
                ])
            }),
            _ => return None,
        })
    }

    fn as_soft_deletable(&self) -> Option<&dyn SoftDeletable> {
        self.archive.as_ref().map(|a| a as &dyn SoftDeletable)
    }

    fn as_soft_deletable_mut(&mut self) -> Option<&mut dyn SoftDeletable> {
        self.archive.as_mut().map(|a| a as &mut dyn SoftDeletable)
    }
}

pub fn document(id: Id, title: &str, pages: i64) -> Document {
    Document {
        id: Some(id),
        title: title.to_string(),
        pages,
        published: true,
        ..Default::default()
    }
}

pub fn archived(mut doc: Document) -> Document {
    doc.archive = Some(Archive::default());
    doc
}

/// Four documents; the first and third can be soft-deleted
pub fn sample_documents() -> Vec<Document> {
    vec![
        archived(document(1, "Alpha", 10)),
        document(2, "Beta", 250),
        archived(document(3, "Gamma", 40)),
        Document {
            published: false,
            ..document(4, "Delta", 40)
        },
    ]
}
