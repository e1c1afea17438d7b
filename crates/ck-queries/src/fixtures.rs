//! Test entities shared by the unit tests of this crate

use ck_core::{
    ElementType, Entity, Id, Identifiable, ObjectShape, PropertyDescriptor, ScalarType, Value,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Address {
    pub city: String,
    pub zip: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderLine {
    pub id: Option<Id>,
    pub sku: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Order {
    pub id: Option<Id>,
    pub number: String,
    pub total: f64,
    pub lines: Vec<OrderLine>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Employee {
    pub id: Option<Id>,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Customer {
    pub id: Option<Id>,
    pub name: String,
    pub age: i64,
    pub score: f64,
    pub active: bool,
    pub email: Option<String>,
    pub tags: Vec<String>,
    pub address: Address,
    pub orders: Vec<Order>,
    pub manager: Option<Employee>,
    pub password: String,
}

static ADDRESS_PROPERTIES: [PropertyDescriptor; 2] = [
    PropertyDescriptor::text("City"),
    PropertyDescriptor::text("Zip"),
];

static ORDER_LINE_PROPERTIES: [PropertyDescriptor; 3] = [
    PropertyDescriptor::scalar("Id", ScalarType::Int).read_only(),
    PropertyDescriptor::text("Sku"),
    PropertyDescriptor::scalar("Quantity", ScalarType::Int),
];

static ORDER_PROPERTIES: [PropertyDescriptor; 4] = [
    PropertyDescriptor::scalar("Id", ScalarType::Int).read_only(),
    PropertyDescriptor::text("Number"),
    PropertyDescriptor::scalar("Total", ScalarType::Float),
    PropertyDescriptor::collection("Lines", ElementType::Object(ORDER_LINE_SHAPE)),
];

static EMPLOYEE_PROPERTIES: [PropertyDescriptor; 2] = [
    PropertyDescriptor::scalar("Id", ScalarType::Int).read_only(),
    PropertyDescriptor::text("Name"),
];

static CUSTOMER_PROPERTIES: [PropertyDescriptor; 11] = [
    PropertyDescriptor::scalar("Id", ScalarType::Int).read_only(),
    PropertyDescriptor::text("Name"),
    PropertyDescriptor::scalar("Age", ScalarType::Int),
    PropertyDescriptor::scalar("Score", ScalarType::Float),
    PropertyDescriptor::scalar("Active", ScalarType::Bool),
    PropertyDescriptor::text("Email"),
    PropertyDescriptor::collection("Tags", ElementType::Text),
    PropertyDescriptor::object("Address", ADDRESS_SHAPE),
    PropertyDescriptor::collection("Orders", ElementType::Object(ORDER_SHAPE)),
    PropertyDescriptor::object("Manager", EMPLOYEE_SHAPE),
    PropertyDescriptor::text("Password").write_only(),
];

fn address_properties() -> &'static [PropertyDescriptor] {
    &ADDRESS_PROPERTIES
}

fn order_line_properties() -> &'static [PropertyDescriptor] {
    &ORDER_LINE_PROPERTIES
}

fn order_properties() -> &'static [PropertyDescriptor] {
    &ORDER_PROPERTIES
}

fn employee_properties() -> &'static [PropertyDescriptor] {
    &EMPLOYEE_PROPERTIES
}

const ADDRESS_SHAPE: ObjectShape = ObjectShape::value_object("Address", address_properties);
const ORDER_LINE_SHAPE: ObjectShape = ObjectShape::entity("OrderLine", order_line_properties);
const ORDER_SHAPE: ObjectShape = ObjectShape::entity("Order", order_properties);
const EMPLOYEE_SHAPE: ObjectShape = ObjectShape::entity("Employee", employee_properties);

impl Address {
    pub fn to_value(&self) -> Value {
        Value::object([
            ("City", Value::from(&self.city)),
            ("Zip", Value::from(&self.zip)),
        ])
    }
}

impl OrderLine {
    pub fn to_value(&self) -> Value {
        Value::object([
            ("Id", Value::from(self.id)),
            ("Sku", Value::from(&self.sku)),
            ("Quantity", Value::from(self.quantity)),
        ])
    }
}

impl Order {
    pub fn to_value(&self) -> Value {
        Value::object([
            ("Id", Value::from(self.id)),
            ("Number", Value::from(&self.number)),
            ("Total", Value::from(self.total)),
            (
                "Lines",
                Value::List(self.lines.iter().map(OrderLine::to_value).collect()),
            ),
        ])
    }
}

impl Employee {
    pub fn to_value(&self) -> Value {
        Value::object([
            ("Id", Value::from(self.id)),
            ("Name", Value::from(&self.name)),
        ])
    }
}

impl Identifiable for Customer {
    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Identifiable for Order {
    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Entity for Customer {
    const TYPE_NAME: &'static str = "Customer";
    const TABLE_NAME: &'static str = "customers";

    fn properties() -> &'static [PropertyDescriptor] {
        &CUSTOMER_PROPERTIES
    }

    fn property(&self, name: &str) -> Option<Value> {
        Some(match name {
            "Id" => Value::from(self.id),
            "Name" => Value::from(&self.name),
            "Age" => Value::from(self.age),
            "Score" => Value::from(self.score),
            "Active" => Value::from(self.active),
            "Email" => Value::from(self.email.clone()),
            "Tags" => Value::from(self.tags.clone()),
            "Address" => self.address.to_value(),
            "Orders" => Value::List(self.orders.iter().map(Order::to_value).collect()),
            "Manager" => self.manager.as_ref().map_or(Value::Null, Employee::to_value),
            _ => return None,
        })
    }
}

impl Entity for Order {
    const TYPE_NAME: &'static str = "Order";
    const TABLE_NAME: &'static str = "orders";

    fn properties() -> &'static [PropertyDescriptor] {
        &ORDER_PROPERTIES
    }

    fn property(&self, name: &str) -> Option<Value> {
        match self.to_value() {
            Value::Object(mut fields) => fields.remove(name),
            _ => None,
        }
    }
}

pub fn customer(id: Id, name: &str, age: i64) -> Customer {
    Customer {
        id: Some(id),
        name: name.to_string(),
        age,
        active: true,
        email: Some(format!("{}@example.com", name.to_lowercase())),
        ..Default::default()
    }
}

/// Five customers with distinct ages and a mix of cities
pub fn sample_customers() -> Vec<Customer> {
    let mut rows = vec![
        customer(1, "John", 30),
        customer(2, "Ann", 41),
        customer(3, "Bob", 17),
        customer(4, "Zoe", 25),
        customer(5, "Johnny", 52),
    ];
    for (row, city) in rows.iter_mut().zip(["Oslo", "Bergen", "Oslo", "Tromso", "Bergen"]) {
        row.address.city = city.to_string();
    }
    rows[1].active = false;
    rows[2].email = None;
    rows[3].score = 4.5;
    rows
}
