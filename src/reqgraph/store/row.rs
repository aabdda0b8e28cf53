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

//! Column mapping for each kind. A payload that lives in its own table
//! implements `Row`: the SQL bodies for its insert/update/select plus the
//! parameter binding in column order. The neutral kind has no `Row`; it is
//! entirely base tables.

use rusqlite::{Row as SqlRow, ToSql};

use crate::node::{
    Actor, Completed, Effort, EmailAddress, Event, Goal, GraphNode,
    InternationalAddress, KeyValue, Organization, Person, PhoneNumber,
    Product, Project, Purpose, RecurringTodo, Requirement, Role,
    ServerLocatorNode, Story, Text, TimeEstimate, Todo, UsAddress, UseCase,
};

pub(super) trait Row: Sized {
    const INSERT: &'static str;
    const UPDATE: &'static str;
    const SELECT: &'static str;

    /// Parameters in column order, excluding the leading `id`.
    fn bind(&self) -> Vec<&dyn ToSql>;

    /// Rebuilds the payload from a row produced by `SELECT`.
    fn read(row: &SqlRow<'_>) -> rusqlite::Result<Self>;
}

impl Row for GraphNode {
    const INSERT: &'static str =
        "INSERT INTO graph_node (id, title) VALUES (?1, ?2)";
    const UPDATE: &'static str =
        "UPDATE graph_node SET title = ?2 WHERE id = ?1";
    const SELECT: &'static str = "SELECT title FROM graph_node WHERE id = ?1";

    fn bind(&self) -> Vec<&dyn ToSql> {
        vec![&self.title]
    }

    fn read(row: &SqlRow<'_>) -> rusqlite::Result<GraphNode> {
        Ok(GraphNode { title: row.get(0)? })
    }
}

impl Row for Organization {
    const INSERT: &'static str =
        "INSERT INTO organization (id, locked, name) VALUES (?1, ?2, ?3)";
    const UPDATE: &'static str =
        "UPDATE organization SET locked = ?2, name = ?3 WHERE id = ?1";
    const SELECT: &'static str =
        "SELECT locked, name FROM organization WHERE id = ?1";

    fn bind(&self) -> Vec<&dyn ToSql> {
        vec![&self.locked, &self.name]
    }

    fn read(row: &SqlRow<'_>) -> rusqlite::Result<Organization> {
        Ok(Organization {
            locked: row.get(0)?,
            name: row.get(1)?,
        })
    }
}

impl Row for Product {
    const INSERT: &'static str =
        "INSERT INTO product (id, title, description) VALUES (?1, ?2, ?3)";
    const UPDATE: &'static str =
        "UPDATE product SET title = ?2, description = ?3 WHERE id = ?1";
    const SELECT: &'static str =
        "SELECT title, description FROM product WHERE id = ?1";

    fn bind(&self) -> Vec<&dyn ToSql> {
        vec![&self.title, &self.description]
    }

    fn read(row: &SqlRow<'_>) -> rusqlite::Result<Product> {
        Ok(Product {
            title: row.get(0)?,
            description: row.get(1)?,
            commit: Default::default(),
        })
    }
}

impl Row for Project {
    const INSERT: &'static str =
        "INSERT INTO project (id, name, description) VALUES (?1, ?2, ?3)";
    const UPDATE: &'static str =
        "UPDATE project SET name = ?2, description = ?3 WHERE id = ?1";
    const SELECT: &'static str =
        "SELECT name, description FROM project WHERE id = ?1";

    fn bind(&self) -> Vec<&dyn ToSql> {
        vec![&self.name, &self.description]
    }

    fn read(row: &SqlRow<'_>) -> rusqlite::Result<Project> {
        Ok(Project {
            name: row.get(0)?,
            description: row.get(1)?,
        })
    }
}

impl Row for Requirement {
    const INSERT: &'static str = "INSERT INTO requirement \
                                  (id, title, text, functional) \
                                  VALUES (?1, ?2, ?3, ?4)";
    const UPDATE: &'static str = "UPDATE requirement \
                                  SET title = ?2, text = ?3, functional = ?4 \
                                  WHERE id = ?1";
    const SELECT: &'static str =
        "SELECT title, text, functional FROM requirement WHERE id = ?1";

    fn bind(&self) -> Vec<&dyn ToSql> {
        vec![&self.title, &self.text, &self.functional]
    }

    fn read(row: &SqlRow<'_>) -> rusqlite::Result<Requirement> {
        Ok(Requirement {
            title: row.get(0)?,
            text: row.get(1)?,
            functional: row.get(2)?,
            commit: Default::default(),
        })
    }
}

impl Row for Story {
    const INSERT: &'static str = "INSERT INTO story \
                                  (id, title, goal, benefit) \
                                  VALUES (?1, ?2, ?3, ?4)";
    const UPDATE: &'static str = "UPDATE story \
                                  SET title = ?2, goal = ?3, benefit = ?4 \
                                  WHERE id = ?1";
    const SELECT: &'static str =
        "SELECT title, goal, benefit FROM story WHERE id = ?1";

    fn bind(&self) -> Vec<&dyn ToSql> {
        vec![&self.title, &self.goal, &self.benefit]
    }

    fn read(row: &SqlRow<'_>) -> rusqlite::Result<Story> {
        Ok(Story {
            title: row.get(0)?,
            goal: row.get(1)?,
            benefit: row.get(2)?,
            commit: Default::default(),
        })
    }
}

impl Row for UseCase {
    const INSERT: &'static str =
        "INSERT INTO use_case (id, name) VALUES (?1, ?2)";
    const UPDATE: &'static str = "UPDATE use_case SET name = ?2 WHERE id = ?1";
    const SELECT: &'static str = "SELECT name FROM use_case WHERE id = ?1";

    fn bind(&self) -> Vec<&dyn ToSql> {
        vec![&self.name]
    }

    fn read(row: &SqlRow<'_>) -> rusqlite::Result<UseCase> {
        Ok(UseCase {
            name: row.get(0)?,
            commit: Default::default(),
        })
    }
}

impl Row for Text {
    const INSERT: &'static str =
        "INSERT INTO text (id, text) VALUES (?1, ?2)";
    const UPDATE: &'static str = "UPDATE text SET text = ?2 WHERE id = ?1";
    const SELECT: &'static str = "SELECT text FROM text WHERE id = ?1";

    fn bind(&self) -> Vec<&dyn ToSql> {
        vec![&self.text]
    }

    fn read(row: &SqlRow<'_>) -> rusqlite::Result<Text> {
        Ok(Text { text: row.get(0)? })
    }
}

impl Row for Completed {
    const INSERT: &'static str =
        "INSERT INTO completed (id, description) VALUES (?1, ?2)";
    const UPDATE: &'static str =
        "UPDATE completed SET description = ?2 WHERE id = ?1";
    const SELECT: &'static str =
        "SELECT description FROM completed WHERE id = ?1";

    fn bind(&self) -> Vec<&dyn ToSql> {
        vec![&self.description]
    }

    fn read(row: &SqlRow<'_>) -> rusqlite::Result<Completed> {
        Ok(Completed {
            description: row.get(0)?,
        })
    }
}

impl Row for KeyValue {
    const INSERT: &'static str =
        "INSERT INTO keyvalue (id, key, value) VALUES (?1, ?2, ?3)";
    const UPDATE: &'static str =
        "UPDATE keyvalue SET key = ?2, value = ?3 WHERE id = ?1";
    const SELECT: &'static str =
        "SELECT key, value FROM keyvalue WHERE id = ?1";

    fn bind(&self) -> Vec<&dyn ToSql> {
        vec![&self.key, &self.value]
    }

    fn read(row: &SqlRow<'_>) -> rusqlite::Result<KeyValue> {
        Ok(KeyValue {
            key: row.get(0)?,
            value: row.get(1)?,
        })
    }
}

impl Row for TimeEstimate {
    const INSERT: &'static str = "INSERT INTO time_estimate \
                                  (id, text, estimate, started, start) \
                                  VALUES (?1, ?2, ?3, ?4, ?5)";
    const UPDATE: &'static str = "UPDATE time_estimate \
                                  SET text = ?2, estimate = ?3, \
                                      started = ?4, start = ?5 \
                                  WHERE id = ?1";
    const SELECT: &'static str = "SELECT text, estimate, started, start \
                                  FROM time_estimate WHERE id = ?1";

    fn bind(&self) -> Vec<&dyn ToSql> {
        vec![&self.text, &self.estimate, &self.started, &self.start]
    }

    fn read(row: &SqlRow<'_>) -> rusqlite::Result<TimeEstimate> {
        Ok(TimeEstimate {
            text: row.get(0)?,
            estimate: row.get(1)?,
            started: row.get(2)?,
            start: row.get(3)?,
        })
    }
}

impl Row for Effort {
    const INSERT: &'static str =
        "INSERT INTO effort (id, text, effort) VALUES (?1, ?2, ?3)";
    const UPDATE: &'static str =
        "UPDATE effort SET text = ?2, effort = ?3 WHERE id = ?1";
    const SELECT: &'static str =
        "SELECT text, effort FROM effort WHERE id = ?1";

    fn bind(&self) -> Vec<&dyn ToSql> {
        vec![&self.text, &self.effort]
    }

    fn read(row: &SqlRow<'_>) -> rusqlite::Result<Effort> {
        Ok(Effort {
            text: row.get(0)?,
            effort: row.get(1)?,
        })
    }
}

impl Row for Role {
    const INSERT: &'static str = "INSERT INTO role (id, who) VALUES (?1, ?2)";
    const UPDATE: &'static str = "UPDATE role SET who = ?2 WHERE id = ?1";
    const SELECT: &'static str = "SELECT who FROM role WHERE id = ?1";

    fn bind(&self) -> Vec<&dyn ToSql> {
        vec![&self.who]
    }

    fn read(row: &SqlRow<'_>) -> rusqlite::Result<Role> {
        Ok(Role { who: row.get(0)? })
    }
}

impl Row for Actor {
    const INSERT: &'static str =
        "INSERT INTO actor (id, actor) VALUES (?1, ?2)";
    const UPDATE: &'static str = "UPDATE actor SET actor = ?2 WHERE id = ?1";
    const SELECT: &'static str = "SELECT actor FROM actor WHERE id = ?1";

    fn bind(&self) -> Vec<&dyn ToSql> {
        vec![&self.actor]
    }

    fn read(row: &SqlRow<'_>) -> rusqlite::Result<Actor> {
        Ok(Actor { actor: row.get(0)? })
    }
}

impl Row for Goal {
    const INSERT: &'static str =
        "INSERT INTO goal \
         (id, action, outcome, context, target_date, \
          target_date_confidence, alignment) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";
    const UPDATE: &'static str =
        "UPDATE goal \
         SET action = ?2, outcome = ?3, context = ?4, target_date = ?5, \
             target_date_confidence = ?6, alignment = ?7 \
         WHERE id = ?1";
    const SELECT: &'static str =
        "SELECT action, outcome, context, target_date, \
                target_date_confidence, alignment \
         FROM goal WHERE id = ?1";

    fn bind(&self) -> Vec<&dyn ToSql> {
        vec![
            &self.action,
            &self.outcome,
            &self.context,
            &self.target_date,
            &self.target_date_confidence,
            &self.alignment,
        ]
    }

    fn read(row: &SqlRow<'_>) -> rusqlite::Result<Goal> {
        Ok(Goal {
            action: row.get(0)?,
            outcome: row.get(1)?,
            context: row.get(2)?,
            target_date: row.get(3)?,
            target_date_confidence: row.get(4)?,
            alignment: row.get(5)?,
        })
    }
}

impl Row for Purpose {
    const INSERT: &'static str =
        "INSERT INTO purpose \
         (id, description, deadline, deadline_confidence) \
         VALUES (?1, ?2, ?3, ?4)";
    const UPDATE: &'static str =
        "UPDATE purpose \
         SET description = ?2, deadline = ?3, deadline_confidence = ?4 \
         WHERE id = ?1";
    const SELECT: &'static str =
        "SELECT description, deadline, deadline_confidence \
         FROM purpose WHERE id = ?1";

    fn bind(&self) -> Vec<&dyn ToSql> {
        vec![&self.description, &self.deadline, &self.deadline_confidence]
    }

    fn read(row: &SqlRow<'_>) -> rusqlite::Result<Purpose> {
        Ok(Purpose {
            description: row.get(0)?,
            deadline: row.get(1)?,
            deadline_confidence: row.get(2)?,
        })
    }
}

impl Row for Person {
    const INSERT: &'static str =
        "INSERT INTO person (id, first_name, last_name) VALUES (?1, ?2, ?3)";
    const UPDATE: &'static str =
        "UPDATE person SET first_name = ?2, last_name = ?3 WHERE id = ?1";
    const SELECT: &'static str =
        "SELECT first_name, last_name FROM person WHERE id = ?1";

    fn bind(&self) -> Vec<&dyn ToSql> {
        vec![&self.first_name, &self.last_name]
    }

    fn read(row: &SqlRow<'_>) -> rusqlite::Result<Person> {
        Ok(Person {
            first_name: row.get(0)?,
            last_name: row.get(1)?,
        })
    }
}

impl Row for EmailAddress {
    const INSERT: &'static str =
        "INSERT INTO email_address (id, address) VALUES (?1, ?2)";
    const UPDATE: &'static str =
        "UPDATE email_address SET address = ?2 WHERE id = ?1";
    const SELECT: &'static str =
        "SELECT address FROM email_address WHERE id = ?1";

    fn bind(&self) -> Vec<&dyn ToSql> {
        vec![&self.address]
    }

    fn read(row: &SqlRow<'_>) -> rusqlite::Result<EmailAddress> {
        Ok(EmailAddress {
            address: row.get(0)?,
        })
    }
}

impl Row for PhoneNumber {
    const INSERT: &'static str =
        "INSERT INTO phone_number \
         (id, countrycode, number, phone_type) \
         VALUES (?1, ?2, ?3, ?4)";
    const UPDATE: &'static str =
        "UPDATE phone_number \
         SET countrycode = ?2, number = ?3, phone_type = ?4 \
         WHERE id = ?1";
    const SELECT: &'static str =
        "SELECT countrycode, number, phone_type \
         FROM phone_number WHERE id = ?1";

    fn bind(&self) -> Vec<&dyn ToSql> {
        vec![&self.countrycode, &self.number, &self.phone_type]
    }

    fn read(row: &SqlRow<'_>) -> rusqlite::Result<PhoneNumber> {
        Ok(PhoneNumber {
            countrycode: row.get(0)?,
            number: row.get(1)?,
            phone_type: row.get(2)?,
        })
    }
}

impl Row for InternationalAddress {
    const INSERT: &'static str =
        "INSERT INTO international_address \
         (id, country_code, address_lines, locality, postal_code) \
         VALUES (?1, ?2, ?3, ?4, ?5)";
    const UPDATE: &'static str =
        "UPDATE international_address \
         SET country_code = ?2, address_lines = ?3, locality = ?4, \
             postal_code = ?5 \
         WHERE id = ?1";
    const SELECT: &'static str =
        "SELECT country_code, address_lines, locality, postal_code \
         FROM international_address WHERE id = ?1";

    fn bind(&self) -> Vec<&dyn ToSql> {
        vec![
            &self.country_code,
            &self.address_lines,
            &self.locality,
            &self.postal_code,
        ]
    }

    fn read(row: &SqlRow<'_>) -> rusqlite::Result<InternationalAddress> {
        Ok(InternationalAddress {
            country_code: row.get(0)?,
            address_lines: row.get(1)?,
            locality: row.get(2)?,
            postal_code: row.get(3)?,
        })
    }
}

impl Row for UsAddress {
    const INSERT: &'static str =
        "INSERT INTO us_address \
         (id, address_lines, city, state, zipcode) \
         VALUES (?1, ?2, ?3, ?4, ?5)";
    const UPDATE: &'static str =
        "UPDATE us_address \
         SET address_lines = ?2, city = ?3, state = ?4, zipcode = ?5 \
         WHERE id = ?1";
    const SELECT: &'static str =
        "SELECT address_lines, city, state, zipcode \
         FROM us_address WHERE id = ?1";

    fn bind(&self) -> Vec<&dyn ToSql> {
        vec![&self.address_lines, &self.city, &self.state, &self.zipcode]
    }

    fn read(row: &SqlRow<'_>) -> rusqlite::Result<UsAddress> {
        Ok(UsAddress {
            address_lines: row.get(0)?,
            city: row.get(1)?,
            state: row.get(2)?,
            zipcode: row.get(3)?,
        })
    }
}

impl Row for Event {
    const INSERT: &'static str =
        "INSERT INTO event (id, name, description) VALUES (?1, ?2, ?3)";
    const UPDATE: &'static str =
        "UPDATE event SET name = ?2, description = ?3 WHERE id = ?1";
    const SELECT: &'static str =
        "SELECT name, description FROM event WHERE id = ?1";

    fn bind(&self) -> Vec<&dyn ToSql> {
        vec![&self.name, &self.description]
    }

    fn read(row: &SqlRow<'_>) -> rusqlite::Result<Event> {
        Ok(Event {
            name: row.get(0)?,
            description: row.get(1)?,
        })
    }
}

impl Row for RecurringTodo {
    const INSERT: &'static str =
        "INSERT INTO recurring_todo \
         (id, description, created, recurring_interval, seconds_flag, \
          dom_flag, doy_flag) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";
    const UPDATE: &'static str =
        "UPDATE recurring_todo \
         SET description = ?2, created = ?3, recurring_interval = ?4, \
             seconds_flag = ?5, dom_flag = ?6, doy_flag = ?7 \
         WHERE id = ?1";
    const SELECT: &'static str =
        "SELECT description, created, recurring_interval, seconds_flag, \
                dom_flag, doy_flag \
         FROM recurring_todo WHERE id = ?1";

    fn bind(&self) -> Vec<&dyn ToSql> {
        vec![
            &self.description,
            &self.created,
            &self.recurring_interval,
            &self.seconds_flag,
            &self.dom_flag,
            &self.doy_flag,
        ]
    }

    fn read(row: &SqlRow<'_>) -> rusqlite::Result<RecurringTodo> {
        Ok(RecurringTodo {
            description: row.get(0)?,
            created: row.get(1)?,
            recurring_interval: row.get(2)?,
            seconds_flag: row.get(3)?,
            dom_flag: row.get(4)?,
            doy_flag: row.get(5)?,
        })
    }
}

impl Row for Todo {
    const INSERT: &'static str =
        "INSERT INTO todo \
         (id, description, created, due, completed, date_completed, \
          spawned_from) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";
    const UPDATE: &'static str =
        "UPDATE todo \
         SET description = ?2, created = ?3, due = ?4, completed = ?5, \
             date_completed = ?6, spawned_from = ?7 \
         WHERE id = ?1";
    const SELECT: &'static str =
        "SELECT description, created, due, completed, date_completed, \
                spawned_from \
         FROM todo WHERE id = ?1";

    fn bind(&self) -> Vec<&dyn ToSql> {
        vec![
            &self.description,
            &self.created,
            &self.due,
            &self.completed,
            &self.date_completed,
            &self.spawned_from,
        ]
    }

    fn read(row: &SqlRow<'_>) -> rusqlite::Result<Todo> {
        Ok(Todo {
            description: row.get(0)?,
            created: row.get(1)?,
            due: row.get(2)?,
            completed: row.get(3)?,
            date_completed: row.get(4)?,
            spawned_from: row.get(5)?,
        })
    }
}

impl Row for ServerLocatorNode {
    const INSERT: &'static str =
        "INSERT INTO server_locator_node \
         (id, graph_uuid, graph_title, graph_address) \
         VALUES (?1, ?2, ?3, ?4)";
    const UPDATE: &'static str =
        "UPDATE server_locator_node \
         SET graph_uuid = ?2, graph_title = ?3, graph_address = ?4 \
         WHERE id = ?1";
    const SELECT: &'static str =
        "SELECT graph_uuid, graph_title, graph_address \
         FROM server_locator_node WHERE id = ?1";

    fn bind(&self) -> Vec<&dyn ToSql> {
        vec![&self.graph_uuid, &self.graph_title, &self.graph_address]
    }

    fn read(row: &SqlRow<'_>) -> rusqlite::Result<ServerLocatorNode> {
        Ok(ServerLocatorNode {
            graph_uuid: row.get(0)?,
            graph_title: row.get(1)?,
            graph_address: row.get(2)?,
        })
    }
}
