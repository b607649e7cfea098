//! Shared fixtures for document tests.

#![allow(dead_code)]

use serde_json::{json, Value};

pub const LICENSE_ID: &str = "ef15e740-697f-11e3-949a-0800200c9a66";

/// A complete basic-profile License Document as JSON.
pub fn license_value() -> Value {
    json!({
        "id": LICENSE_ID,
        "provider": "https://www.imaginaryebookretailer.com",
        "issued": "2013-11-04T01:08:15+01:00",
        "updated": "2014-02-21T09:44:17+01:00",
        "encryption": {
            "profile": "http://readium.org/lcp/basic-profile",
            "content_key": {
                "encrypted_value": "/k8RpXqf4E2WEunCp76E8PjhS051NXwAXeTD1ioazYxCRGvHLAck/KQ3cCh5JxDmCK0nRLyAxs1X0aA3z55boQ==",
                "algorithm": "http://www.w3.org/2001/04/xmlenc#aes256-cbc"
            },
            "user_key": {
                "text_hint": "Enter your email address",
                "algorithm": "http://www.w3.org/2001/04/xmlenc#sha256",
                "key_check": "jJEjUDipHK3OjGt6kFq7dcOLZuicQFUYwQ+TYkAIWKm6Xv6kpHFhF7LOkUK/Owww"
            }
        },
        "links": [
            {"rel": "hint", "href": "https://www.imaginaryebookretailer.com/lcp/hint", "type": "text/html"},
            {"rel": "publication", "href": "https://www.imaginaryebookretailer.com/books/9780000000001.epub",
             "type": "application/epub+zip", "length": 264556,
             "hash": "8b752f93e5e73a3efff1c706c1c2f267dffc6ec01c382cbe2a6ca9bd57cc8378"},
            {"rel": ["self"], "href": "https://www.imaginaryebookretailer.com/licenses/1.lcpl",
             "type": "application/vnd.readium.lcp.license.v1.0+json"},
            {"rel": "status", "href": "https://lsd.imaginaryebookretailer.com/licenses/1/status",
             "type": "application/vnd.readium.license.status.v1.0+json"}
        ],
        "user": {
            "id": "d9f298a7-7f34-49e7-8aae-4378ecb1d597",
            "email": "EnCt2b8c6d2afd94ae4ed201b27049d8ce1afe31a90ceb8c6d2afd94ae4ed201b2704RjkaXRveAAarHwdlID1KCIwEmS",
            "encrypted": ["email"]
        },
        "rights": {
            "print": 10,
            "copy": 2048,
            "start": "2013-11-04T01:08:15+01:00",
            "end": "2013-11-25T01:08:15+01:00"
        },
        "signature": {
            "algorithm": "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256",
            "certificate": "MIIDEjCCAfoCAQEwDQYJKoZIhvcNAQEFBQAwTzELMAkGA1UEBhMCVVMxEzARBgNVBAoTCkV4YW1wbGUgQ28xEDAOBgNVBAsTB0V4YW1wbGUxGTAXBgNVBAMTEEV4YW1wbGUgUm9vdCBDQTAeFw0xNDAxMDQ=",
            "value": "q/3IInic9c/EaJHyG1Kkqk5v1zlJNsiQBmxz4lykhyD3dA2jg2ZzrOenYU9GxP/xhe5H5Kt2WaJ/hnt8+GWrEx1QOwnNEij5CmIpZ63yRNKnFS5rSRnDMYmQT/fkUYco7BUi7MPPU6OFf4+kaToNWl8m/ZlMxDcS3BZnVhSEKzUNQn1f2y3sUcXjes7wHbImDc6dRthbL/E+assh5HEqakrDuA4lM8XNfukEYQJnivqhqMLOGM33RnS5nZKrPPK/c2F/vGjJffSrlX3W3Jlds0/MZ6wtVeKIugR06c56V6+qKsnMLAQJaeOxxBXmbFdAEyplP9irn4D9tQZKqbbMIw=="
        }
    })
}

pub fn license_bytes() -> Vec<u8> {
    serde_json::to_vec_pretty(&license_value()).unwrap()
}

/// Removes `key` from the object at `pointer` and returns the bytes.
pub fn license_without(pointer: &str, key: &str) -> Vec<u8> {
    let mut value = license_value();
    value
        .pointer_mut(pointer)
        .and_then(Value::as_object_mut)
        .unwrap()
        .remove(key);
    serde_json::to_vec(&value).unwrap()
}

/// A Status Document as JSON.
pub fn status_value(status: &str) -> Value {
    json!({
        "id": LICENSE_ID,
        "status": status,
        "message": "Your license is currently active and has been used on one device.",
        "updated": {
            "license": "2014-02-21T09:44:17+01:00",
            "status": "2014-03-01T12:00:00Z"
        },
        "links": [
            {"rel": "license", "href": "https://lsd.imaginaryebookretailer.com/licenses/1",
             "type": "application/vnd.readium.lcp.license.v1.0+json"},
            {"rel": "register", "href": "https://lsd.imaginaryebookretailer.com/licenses/1/register{?id,name}",
             "type": "application/vnd.readium.license.status.v1.0+json", "templated": true},
            {"rel": "return", "href": "https://lsd.imaginaryebookretailer.com/licenses/1/return{?id,name}",
             "type": "application/vnd.readium.lcp.license.v1.0+json", "templated": true},
            {"rel": "renew", "href": "https://www.imaginaryebookretailer.com/renew", "type": "text/html"},
            {"rel": "renew", "href": "https://lsd.imaginaryebookretailer.com/licenses/1/renew{?end,id,name}",
             "type": "application/vnd.readium.lcp.license.v1.0+json", "templated": true}
        ],
        "potential_rights": {"end": "2014-09-04T01:08:15+01:00"},
        "events": [
            {"type": "register", "name": "Reading App", "timestamp": "2014-01-04T01:08:15+01:00", "id": "709e1380-3528-11e4-8c21-0800200c9a66"},
            {"type": "renew", "name": "Reading App", "timestamp": "2014-02-04T01:08:15+01:00", "id": "709e1380-3528-11e4-8c21-0800200c9a66"},
            {"type": "register", "name": "Other App", "timestamp": "2014-02-05T01:08:15+01:00", "id": "dd7de2a8-1b2e-4c2f-a66e-4b7b6d1e9e11"}
        ]
    })
}

pub fn status_bytes(status: &str) -> Vec<u8> {
    serde_json::to_vec(&status_value(status)).unwrap()
}
