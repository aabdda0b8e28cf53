// Copyright (c) 2019 Jason White
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.

//! The closed family of node kinds. Every node carries exactly one of the
//! payloads below; the variant decides the wire name, the store table, and
//! the codec. Adding a kind means touching this file, the schema, and the
//! codec registry, and nothing else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::NodeId;

/// Commit state shared by the commitable kinds. Never serialized through
/// serde; the archive writes these fields by hand because the change links
/// participate in reference sharing.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Commit {
    pub committed: bool,
    pub change_parent: Option<NodeId>,
    pub change_child: Option<NodeId>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphNode {
    pub title: String,
}

impl GraphNode {
    pub fn new<S: Into<String>>(title: S) -> GraphNode {
        GraphNode {
            title: title.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Organization {
    pub locked: bool,
    pub name: String,
}

impl Organization {
    pub fn new<S: Into<String>>(name: S) -> Organization {
        Organization {
            locked: false,
            name: name.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
    pub title: String,
    pub description: String,

    #[serde(skip)]
    pub commit: Commit,
}

impl Product {
    pub fn new<S: Into<String>>(title: S) -> Product {
        Product {
            title: title.into(),
            ..Product::default()
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Project {
    pub name: String,
    pub description: String,
}

impl Project {
    pub fn new<S: Into<String>>(name: S) -> Project {
        Project {
            name: name.into(),
            description: String::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Requirement {
    pub title: String,
    pub text: String,
    pub functional: bool,

    #[serde(skip)]
    pub commit: Commit,
}

impl Requirement {
    pub fn new<S: Into<String>>(title: S) -> Requirement {
        Requirement {
            title: title.into(),
            ..Requirement::default()
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Story {
    pub title: String,
    pub goal: String,
    pub benefit: String,

    #[serde(skip)]
    pub commit: Commit,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UseCase {
    pub name: String,

    #[serde(skip)]
    pub commit: Commit,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Text {
    pub text: String,
}

impl Text {
    pub fn new<S: Into<String>>(text: S) -> Text {
        Text { text: text.into() }
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Completed {
    pub description: String,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeEstimate {
    pub text: String,
    pub estimate: i64,
    pub started: bool,
    pub start: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Effort {
    pub text: String,
    pub effort: i64,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Role {
    pub who: String,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Actor {
    pub actor: String,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Goal {
    pub action: String,
    pub outcome: String,
    pub context: String,
    pub target_date: Option<DateTime<Utc>>,
    pub target_date_confidence: String,
    pub alignment: String,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Purpose {
    pub description: String,
    pub deadline: Option<DateTime<Utc>>,
    pub deadline_confidence: String,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Person {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EmailAddress {
    pub address: String,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PhoneNumber {
    pub countrycode: String,
    pub number: String,
    pub phone_type: String,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct InternationalAddress {
    pub country_code: String,
    pub locality: String,
    pub postal_code: String,

    /// Head of the address line chain; the rest hangs off that text node's
    /// down links.
    #[serde(skip)]
    pub address_lines: Option<NodeId>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UsAddress {
    pub city: String,
    pub state: String,
    pub zipcode: String,

    #[serde(skip)]
    pub address_lines: Option<NodeId>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Event {
    pub name: String,
    pub description: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RecurringTodo {
    pub description: String,
    pub created: DateTime<Utc>,
    pub recurring_interval: i64,
    pub seconds_flag: bool,
    pub dom_flag: bool,
    pub doy_flag: bool,
}

impl Default for RecurringTodo {
    fn default() -> RecurringTodo {
        RecurringTodo {
            description: String::new(),
            created: Utc::now(),
            recurring_interval: 0,
            seconds_flag: false,
            dom_flag: false,
            doy_flag: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Todo {
    pub description: String,
    pub created: DateTime<Utc>,
    pub due: Option<DateTime<Utc>>,
    pub completed: bool,
    pub date_completed: Option<DateTime<Utc>>,
    pub spawned_from: Option<NodeId>,
}

impl Default for Todo {
    fn default() -> Todo {
        Todo {
            description: String::new(),
            created: Utc::now(),
            due: None,
            completed: false,
            date_completed: None,
            spawned_from: None,
        }
    }
}

impl Todo {
    /// A concrete todo spawned from one occurrence of a recurring todo.
    pub fn from_recurring(recurring: &RecurringTodo, from: NodeId) -> Todo {
        Todo {
            description: recurring.description.clone(),
            spawned_from: Some(from),
            ..Todo::default()
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerLocatorNode {
    pub graph_uuid: String,
    pub graph_title: String,
    pub graph_address: String,
}

/// Tag discriminating the payload shape of a node. `Node` is the neutral
/// kind: no scalar attributes, no kind table, only identity and edges.
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub enum Kind {
    Node,
    GraphNode,
    Organization,
    Product,
    Project,
    Requirement,
    Story,
    UseCase,
    Text,
    Completed,
    KeyValue,
    TimeEstimate,
    Effort,
    Role,
    Actor,
    Goal,
    Purpose,
    Person,
    EmailAddress,
    PhoneNumber,
    InternationalAddress,
    UsAddress,
    Event,
    RecurringTodo,
    Todo,
    ServerLocatorNode,
}

impl Kind {
    /// Every kind, in a stable order. Used for schema bootstrap and tests.
    pub const ALL: [Kind; 26] = [
        Kind::Node,
        Kind::GraphNode,
        Kind::Organization,
        Kind::Product,
        Kind::Project,
        Kind::Requirement,
        Kind::Story,
        Kind::UseCase,
        Kind::Text,
        Kind::Completed,
        Kind::KeyValue,
        Kind::TimeEstimate,
        Kind::Effort,
        Kind::Role,
        Kind::Actor,
        Kind::Goal,
        Kind::Purpose,
        Kind::Person,
        Kind::EmailAddress,
        Kind::PhoneNumber,
        Kind::InternationalAddress,
        Kind::UsAddress,
        Kind::Event,
        Kind::RecurringTodo,
        Kind::Todo,
        Kind::ServerLocatorNode,
    ];

    /// The stable wire name. This is what keys a node's record in a graph
    /// document and what the `node.kind_name` column stores.
    pub fn name(self) -> &'static str {
        match self {
            Kind::Node => "Node",
            Kind::GraphNode => "GraphNode",
            Kind::Organization => "Organization",
            Kind::Product => "Product",
            Kind::Project => "Project",
            Kind::Requirement => "Requirement",
            Kind::Story => "Story",
            Kind::UseCase => "UseCase",
            Kind::Text => "Text",
            Kind::Completed => "Completed",
            Kind::KeyValue => "KeyValue",
            Kind::TimeEstimate => "TimeEstimate",
            Kind::Effort => "Effort",
            Kind::Role => "Role",
            Kind::Actor => "Actor",
            Kind::Goal => "Goal",
            Kind::Purpose => "Purpose",
            Kind::Person => "Person",
            Kind::EmailAddress => "EmailAddress",
            Kind::PhoneNumber => "PhoneNumber",
            Kind::InternationalAddress => "InternationalAddress",
            Kind::UsAddress => "USAddress",
            Kind::Event => "Event",
            Kind::RecurringTodo => "RecurringTodo",
            Kind::Todo => "Todo",
            Kind::ServerLocatorNode => "ServerLocatorNode",
        }
    }

    /// The store table holding this kind's scalar columns. The neutral kind
    /// has no table of its own; it lives entirely in `node` and
    /// `node_associations`.
    pub fn table(self) -> Option<&'static str> {
        match self {
            Kind::Node => None,
            Kind::GraphNode => Some("graph_node"),
            Kind::Organization => Some("organization"),
            Kind::Product => Some("product"),
            Kind::Project => Some("project"),
            Kind::Requirement => Some("requirement"),
            Kind::Story => Some("story"),
            Kind::UseCase => Some("use_case"),
            Kind::Text => Some("text"),
            Kind::Completed => Some("completed"),
            Kind::KeyValue => Some("keyvalue"),
            Kind::TimeEstimate => Some("time_estimate"),
            Kind::Effort => Some("effort"),
            Kind::Role => Some("role"),
            Kind::Actor => Some("actor"),
            Kind::Goal => Some("goal"),
            Kind::Purpose => Some("purpose"),
            Kind::Person => Some("person"),
            Kind::EmailAddress => Some("email_address"),
            Kind::PhoneNumber => Some("phone_number"),
            Kind::InternationalAddress => Some("international_address"),
            Kind::UsAddress => Some("us_address"),
            Kind::Event => Some("event"),
            Kind::RecurringTodo => Some("recurring_todo"),
            Kind::Todo => Some("todo"),
            Kind::ServerLocatorNode => Some("server_locator_node"),
        }
    }

    /// Looks a kind up by its wire name. Callers that need the documented
    /// fallback behavior map `None` to `Kind::Node` themselves.
    pub fn from_name(name: &str) -> Option<Kind> {
        Kind::ALL.iter().cloned().find(|k| k.name() == name)
    }
}

/// The per-kind data of a node.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Payload {
    Node,
    GraphNode(GraphNode),
    Organization(Organization),
    Product(Product),
    Project(Project),
    Requirement(Requirement),
    Story(Story),
    UseCase(UseCase),
    Text(Text),
    Completed(Completed),
    KeyValue(KeyValue),
    TimeEstimate(TimeEstimate),
    Effort(Effort),
    Role(Role),
    Actor(Actor),
    Goal(Goal),
    Purpose(Purpose),
    Person(Person),
    EmailAddress(EmailAddress),
    PhoneNumber(PhoneNumber),
    InternationalAddress(InternationalAddress),
    UsAddress(UsAddress),
    Event(Event),
    RecurringTodo(RecurringTodo),
    Todo(Todo),
    ServerLocatorNode(ServerLocatorNode),
}

impl Payload {
    pub fn kind(&self) -> Kind {
        match self {
            Payload::Node => Kind::Node,
            Payload::GraphNode(_) => Kind::GraphNode,
            Payload::Organization(_) => Kind::Organization,
            Payload::Product(_) => Kind::Product,
            Payload::Project(_) => Kind::Project,
            Payload::Requirement(_) => Kind::Requirement,
            Payload::Story(_) => Kind::Story,
            Payload::UseCase(_) => Kind::UseCase,
            Payload::Text(_) => Kind::Text,
            Payload::Completed(_) => Kind::Completed,
            Payload::KeyValue(_) => Kind::KeyValue,
            Payload::TimeEstimate(_) => Kind::TimeEstimate,
            Payload::Effort(_) => Kind::Effort,
            Payload::Role(_) => Kind::Role,
            Payload::Actor(_) => Kind::Actor,
            Payload::Goal(_) => Kind::Goal,
            Payload::Purpose(_) => Kind::Purpose,
            Payload::Person(_) => Kind::Person,
            Payload::EmailAddress(_) => Kind::EmailAddress,
            Payload::PhoneNumber(_) => Kind::PhoneNumber,
            Payload::InternationalAddress(_) => Kind::InternationalAddress,
            Payload::UsAddress(_) => Kind::UsAddress,
            Payload::Event(_) => Kind::Event,
            Payload::RecurringTodo(_) => Kind::RecurringTodo,
            Payload::Todo(_) => Kind::Todo,
            Payload::ServerLocatorNode(_) => Kind::ServerLocatorNode,
        }
    }

    /// A default-valued payload of the given kind. The factory allocates
    /// these before the per-kind load fills the fields in.
    pub fn blank(kind: Kind) -> Payload {
        match kind {
            Kind::Node => Payload::Node,
            Kind::GraphNode => Payload::GraphNode(GraphNode::default()),
            Kind::Organization => {
                Payload::Organization(Organization::default())
            }
            Kind::Product => Payload::Product(Product::default()),
            Kind::Project => Payload::Project(Project::default()),
            Kind::Requirement => Payload::Requirement(Requirement::default()),
            Kind::Story => Payload::Story(Story::default()),
            Kind::UseCase => Payload::UseCase(UseCase::default()),
            Kind::Text => Payload::Text(Text::default()),
            Kind::Completed => Payload::Completed(Completed::default()),
            Kind::KeyValue => Payload::KeyValue(KeyValue::default()),
            Kind::TimeEstimate => {
                Payload::TimeEstimate(TimeEstimate::default())
            }
            Kind::Effort => Payload::Effort(Effort::default()),
            Kind::Role => Payload::Role(Role::default()),
            Kind::Actor => Payload::Actor(Actor::default()),
            Kind::Goal => Payload::Goal(Goal::default()),
            Kind::Purpose => Payload::Purpose(Purpose::default()),
            Kind::Person => Payload::Person(Person::default()),
            Kind::EmailAddress => {
                Payload::EmailAddress(EmailAddress::default())
            }
            Kind::PhoneNumber => Payload::PhoneNumber(PhoneNumber::default()),
            Kind::InternationalAddress => {
                Payload::InternationalAddress(InternationalAddress::default())
            }
            Kind::UsAddress => Payload::UsAddress(UsAddress::default()),
            Kind::Event => Payload::Event(Event::default()),
            Kind::RecurringTodo => {
                Payload::RecurringTodo(RecurringTodo::default())
            }
            Kind::Todo => Payload::Todo(Todo::default()),
            Kind::ServerLocatorNode => {
                Payload::ServerLocatorNode(ServerLocatorNode::default())
            }
        }
    }

    /// The scalar fields as a JSON object. The neutral kind has none.
    pub fn to_scalars(&self) -> serde_json::Value {
        match self {
            Payload::Node => serde_json::json!({}),
            Payload::GraphNode(x) => serde_json::to_value(x).unwrap(),
            Payload::Organization(x) => serde_json::to_value(x).unwrap(),
            Payload::Product(x) => serde_json::to_value(x).unwrap(),
            Payload::Project(x) => serde_json::to_value(x).unwrap(),
            Payload::Requirement(x) => serde_json::to_value(x).unwrap(),
            Payload::Story(x) => serde_json::to_value(x).unwrap(),
            Payload::UseCase(x) => serde_json::to_value(x).unwrap(),
            Payload::Text(x) => serde_json::to_value(x).unwrap(),
            Payload::Completed(x) => serde_json::to_value(x).unwrap(),
            Payload::KeyValue(x) => serde_json::to_value(x).unwrap(),
            Payload::TimeEstimate(x) => serde_json::to_value(x).unwrap(),
            Payload::Effort(x) => serde_json::to_value(x).unwrap(),
            Payload::Role(x) => serde_json::to_value(x).unwrap(),
            Payload::Actor(x) => serde_json::to_value(x).unwrap(),
            Payload::Goal(x) => serde_json::to_value(x).unwrap(),
            Payload::Purpose(x) => serde_json::to_value(x).unwrap(),
            Payload::Person(x) => serde_json::to_value(x).unwrap(),
            Payload::EmailAddress(x) => serde_json::to_value(x).unwrap(),
            Payload::PhoneNumber(x) => serde_json::to_value(x).unwrap(),
            Payload::InternationalAddress(x) => {
                serde_json::to_value(x).unwrap()
            }
            Payload::UsAddress(x) => serde_json::to_value(x).unwrap(),
            Payload::Event(x) => serde_json::to_value(x).unwrap(),
            Payload::RecurringTodo(x) => serde_json::to_value(x).unwrap(),
            Payload::Todo(x) => serde_json::to_value(x).unwrap(),
            Payload::ServerLocatorNode(x) => serde_json::to_value(x).unwrap(),
        }
    }

    /// Rebuilds a payload of the given kind from a JSON object of scalar
    /// fields. Missing fields take their defaults; extra fields are ignored.
    pub fn from_scalars(
        kind: Kind,
        value: serde_json::Value,
    ) -> Result<Payload, serde_json::Error> {
        Ok(match kind {
            Kind::Node => Payload::Node,
            Kind::GraphNode => {
                Payload::GraphNode(serde_json::from_value(value)?)
            }
            Kind::Organization => {
                Payload::Organization(serde_json::from_value(value)?)
            }
            Kind::Product => Payload::Product(serde_json::from_value(value)?),
            Kind::Project => Payload::Project(serde_json::from_value(value)?),
            Kind::Requirement => {
                Payload::Requirement(serde_json::from_value(value)?)
            }
            Kind::Story => Payload::Story(serde_json::from_value(value)?),
            Kind::UseCase => Payload::UseCase(serde_json::from_value(value)?),
            Kind::Text => Payload::Text(serde_json::from_value(value)?),
            Kind::Completed => {
                Payload::Completed(serde_json::from_value(value)?)
            }
            Kind::KeyValue => {
                Payload::KeyValue(serde_json::from_value(value)?)
            }
            Kind::TimeEstimate => {
                Payload::TimeEstimate(serde_json::from_value(value)?)
            }
            Kind::Effort => Payload::Effort(serde_json::from_value(value)?),
            Kind::Role => Payload::Role(serde_json::from_value(value)?),
            Kind::Actor => Payload::Actor(serde_json::from_value(value)?),
            Kind::Goal => Payload::Goal(serde_json::from_value(value)?),
            Kind::Purpose => Payload::Purpose(serde_json::from_value(value)?),
            Kind::Person => Payload::Person(serde_json::from_value(value)?),
            Kind::EmailAddress => {
                Payload::EmailAddress(serde_json::from_value(value)?)
            }
            Kind::PhoneNumber => {
                Payload::PhoneNumber(serde_json::from_value(value)?)
            }
            Kind::InternationalAddress => Payload::InternationalAddress(
                serde_json::from_value(value)?,
            ),
            Kind::UsAddress => {
                Payload::UsAddress(serde_json::from_value(value)?)
            }
            Kind::Event => Payload::Event(serde_json::from_value(value)?),
            Kind::RecurringTodo => {
                Payload::RecurringTodo(serde_json::from_value(value)?)
            }
            Kind::Todo => Payload::Todo(serde_json::from_value(value)?),
            Kind::ServerLocatorNode => {
                Payload::ServerLocatorNode(serde_json::from_value(value)?)
            }
        })
    }

    /// Commit state for the commitable kinds, `None` otherwise.
    pub fn commit(&self) -> Option<&Commit> {
        match self {
            Payload::Product(x) => Some(&x.commit),
            Payload::Requirement(x) => Some(&x.commit),
            Payload::Story(x) => Some(&x.commit),
            Payload::UseCase(x) => Some(&x.commit),
            _ => None,
        }
    }

    pub fn commit_mut(&mut self) -> Option<&mut Commit> {
        match self {
            Payload::Product(x) => Some(&mut x.commit),
            Payload::Requirement(x) => Some(&mut x.commit),
            Payload::Story(x) => Some(&mut x.commit),
            Payload::UseCase(x) => Some(&mut x.commit),
            _ => None,
        }
    }

    /// The head of the address line chain for the address kinds.
    pub fn address_lines(&self) -> Option<NodeId> {
        match self {
            Payload::InternationalAddress(x) => x.address_lines,
            Payload::UsAddress(x) => x.address_lines,
            _ => None,
        }
    }

    pub fn set_address_lines(&mut self, head: Option<NodeId>) {
        match self {
            Payload::InternationalAddress(x) => x.address_lines = head,
            Payload::UsAddress(x) => x.address_lines = head,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_round_trip() {
        for kind in &Kind::ALL {
            assert_eq!(Kind::from_name(kind.name()), Some(*kind));
        }
    }

    #[test]
    fn test_unknown_name() {
        assert_eq!(Kind::from_name("Widget"), None);
        assert_eq!(Kind::from_name("node"), None);
    }

    #[test]
    fn test_fixed_table_renames() {
        assert_eq!(Kind::GraphNode.table(), Some("graph_node"));
        assert_eq!(Kind::UseCase.table(), Some("use_case"));
        assert_eq!(Kind::KeyValue.table(), Some("keyvalue"));
        assert_eq!(Kind::UsAddress.table(), Some("us_address"));
        assert_eq!(Kind::Node.table(), None);
    }

    #[test]
    fn test_blank_kind() {
        for kind in &Kind::ALL {
            assert_eq!(Payload::blank(*kind).kind(), *kind);
        }
    }

    #[test]
    fn test_scalar_round_trip() {
        let payload = Payload::Organization(Organization {
            locked: true,
            name: "Acme".into(),
        });

        let scalars = payload.to_scalars();
        assert_eq!(scalars["locked"], serde_json::json!(true));
        assert_eq!(scalars["name"], serde_json::json!("Acme"));

        let back = Payload::from_scalars(Kind::Organization, scalars).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_todo_from_recurring() {
        let recurring = RecurringTodo {
            description: "water the plants".into(),
            recurring_interval: 86400,
            seconds_flag: true,
            ..RecurringTodo::default()
        };

        let from = NodeId::generate();
        let todo = Todo::from_recurring(&recurring, from);

        assert_eq!(todo.description, "water the plants");
        assert_eq!(todo.spawned_from, Some(from));
        assert!(!todo.completed);
    }
}
