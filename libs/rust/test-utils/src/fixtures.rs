//! Sample pact files.
//!
//! One document per specification layout, each describing the same
//! `web-frontend` / `user-service` contract where the layout allows it.

use serde_json::{Value, json};

/// A V2 pact with flat matching rules and a single provider state.
#[must_use]
pub fn v2_pact() -> Value {
    json!({
        "consumer": {"name": "web-frontend"},
        "provider": {"name": "user-service"},
        "interactions": [{
            "description": "a request for user 1",
            "providerState": "user 1 exists",
            "request": {
                "method": "GET",
                "path": "/users/1",
                "query": "fields=name&fields=email",
                "headers": {"Accept": "application/json"}
            },
            "response": {
                "status": 200,
                "headers": {"Content-Type": "application/json"},
                "body": {"id": 1, "name": "Mary", "email": "mary@example.com"},
                "matchingRules": {
                    "$.body.id": {"match": "type"},
                    "$.body.name": {"match": "type"}
                }
            }
        }],
        "metadata": {"pactSpecification": {"version": "2.0.0"}}
    })
}

/// A V3 pact with categorised matching rules and parameterised states.
#[must_use]
pub fn v3_pact() -> Value {
    json!({
        "consumer": {"name": "web-frontend"},
        "provider": {"name": "user-service"},
        "interactions": [
            {
                "description": "a request for user 1",
                "providerStates": [{"name": "user exists", "params": {"id": 1}}],
                "request": {
                    "method": "GET",
                    "path": "/users/1",
                    "headers": {"Accept": "application/json"}
                },
                "response": {
                    "status": 200,
                    "headers": {"Content-Type": "application/json"},
                    "body": {"id": 1, "name": "Mary", "roles": ["admin"]},
                    "matchingRules": {
                        "body": {
                            "$.id": {"combine": "AND", "matchers": [{"match": "integer"}]},
                            "$.name": {"combine": "AND", "matchers": [{"match": "type"}]},
                            "$.roles": {"combine": "AND", "matchers": [{"match": "type", "min": 1}]}
                        }
                    }
                }
            },
            {
                "description": "a request to create a user",
                "request": {
                    "method": "POST",
                    "path": "/users",
                    "headers": {"Content-Type": "application/json"},
                    "body": {"name": "Fred"}
                },
                "response": {
                    "status": 201
                }
            }
        ],
        "metadata": {"pactSpecification": {"version": "3.0.0"}}
    })
}

/// A V3 message pact.
#[must_use]
pub fn v3_message_pact() -> Value {
    json!({
        "consumer": {"name": "notifier"},
        "provider": {"name": "user-service"},
        "messages": [{
            "description": "a user created event",
            "providerStates": [{"name": "a user was created"}],
            "contents": {"event": "created", "id": 7},
            "metadata": {"contentType": "application/json"},
            "matchingRules": {
                "body": {
                    "$.id": {"combine": "AND", "matchers": [{"match": "integer"}]}
                }
            }
        }],
        "metadata": {"pactSpecification": {"version": "3.0.0"}}
    })
}

/// A V4 pact mixing HTTP, asynchronous and synchronous message interactions.
#[must_use]
pub fn v4_pact() -> Value {
    json!({
        "consumer": {"name": "web-frontend"},
        "provider": {"name": "user-service"},
        "interactions": [
            {
                "type": "Synchronous/HTTP",
                "description": "a request for user 1",
                "providerStates": [{"name": "user exists", "params": {"id": 1}}],
                "request": {
                    "method": "GET",
                    "path": "/users/1",
                    "headers": {"Accept": ["application/json"]}
                },
                "response": {
                    "status": 200,
                    "headers": {"Content-Type": ["application/json"]},
                    "body": {
                        "content": {"id": 1, "name": "Mary"},
                        "contentType": "application/json",
                        "encoded": false
                    },
                    "matchingRules": {
                        "body": {
                            "$.id": {"combine": "AND", "matchers": [{"match": "integer"}]}
                        }
                    }
                },
                "comments": {"testname": "test_get_user"}
            },
            {
                "type": "Asynchronous/Messages",
                "description": "a user created event",
                "contents": {
                    "content": {"event": "created", "id": 7},
                    "contentType": "application/json",
                    "encoded": false
                },
                "metadata": {"contentType": "application/json"}
            },
            {
                "type": "Synchronous/Messages",
                "description": "a user lookup message",
                "request": {
                    "contents": {"content": {"id": 7}, "contentType": "application/json", "encoded": false}
                },
                "response": [{
                    "contents": {"content": {"id": 7, "name": "Mary"}, "contentType": "application/json", "encoded": false}
                }]
            }
        ],
        "metadata": {"pactSpecification": {"version": "4.0"}}
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_name_their_participants() {
        for pact in [v2_pact(), v3_pact(), v3_message_pact(), v4_pact()] {
            assert!(pact["consumer"]["name"].is_string());
            assert!(pact["provider"]["name"].is_string());
            assert!(pact["metadata"]["pactSpecification"]["version"].is_string());
        }
    }
}
