//! Emergency contact registry
//!
//! Contacts are keyed by phone number and kept sorted by ascending
//! priority (lower = contacted first). The book persists itself through
//! the injected [`PersistentStore`] and seeds a default set on first run.

use serde::{Deserialize, Serialize};

use crate::store::PersistentStore;
use crate::{LifelineError, Result};

/// Store key under which the contact list persists itself
pub const CONTACTS_KEY: &str = "emergency_contacts";

/// One person or service to notify when an alert dispatches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    /// Display name
    pub name: String,

    /// Phone number, unique within the book
    pub phone: String,

    /// Relationship to the reporter, e.g. "Family"
    pub relationship: String,

    /// Contact order; lower values are contacted first
    pub priority: u32,
}

impl EmergencyContact {
    /// Create a contact
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        relationship: impl Into<String>,
        priority: u32,
    ) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            relationship: relationship.into(),
            priority,
        }
    }
}

/// Mutable collection of emergency contacts, sorted by priority
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactBook {
    contacts: Vec<EmergencyContact>,
}

impl ContactBook {
    /// Create an empty book
    pub fn new() -> Self {
        Self {
            contacts: Vec::new(),
        }
    }

    /// The built-in default contacts seeded on first run
    pub fn defaults() -> Self {
        Self {
            contacts: vec![
                EmergencyContact::new("Emergency Services", "911", "Emergency", 1),
                EmergencyContact::new("Local Police", "112", "Law Enforcement", 2),
            ],
        }
    }

    /// Add a contact, replacing any existing entry with the same phone,
    /// and re-sort by ascending priority
    pub fn add(&mut self, contact: EmergencyContact) {
        self.contacts.retain(|c| c.phone != contact.phone);
        self.contacts.push(contact);
        self.contacts.sort_by_key(|c| c.priority);
    }

    /// Remove the contact with the given phone number
    pub fn remove(&mut self, phone: &str) -> Result<EmergencyContact> {
        match self.contacts.iter().position(|c| c.phone == phone) {
            Some(index) => Ok(self.contacts.remove(index)),
            None => Err(LifelineError::ContactNotFound(phone.to_string())),
        }
    }

    /// All contacts in ascending priority order
    pub fn all(&self) -> &[EmergencyContact] {
        &self.contacts
    }

    /// Number of contacts
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    /// Whether the book is empty
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Load the book from the store, seeding defaults on first run
    pub async fn load(store: &dyn PersistentStore) -> Result<Self> {
        match store.get(CONTACTS_KEY).await? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => {
                let book = Self::defaults();
                book.save(store).await?;
                Ok(book)
            }
        }
    }

    /// Persist the book
    pub async fn save(&self, store: &dyn PersistentStore) -> Result<()> {
        store.set(CONTACTS_KEY, serde_json::to_vec(self)?).await
    }
}

impl Default for ContactBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_add_sorts_by_priority() {
        let mut book = ContactBook::new();
        book.add(EmergencyContact::new("Charlie", "333", "Friend", 3));
        book.add(EmergencyContact::new("Alice", "111", "Family", 1));
        book.add(EmergencyContact::new("Bob", "222", "Neighbor", 2));

        let names: Vec<_> = book.all().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Alice", "Bob", "Charlie"]);
    }

    #[test]
    fn test_add_replaces_same_phone() {
        let mut book = ContactBook::new();
        book.add(EmergencyContact::new("Alice", "111", "Family", 1));
        book.add(EmergencyContact::new("Alice Updated", "111", "Family", 5));

        assert_eq!(book.len(), 1);
        assert_eq!(book.all()[0].name, "Alice Updated");
        assert_eq!(book.all()[0].priority, 5);
    }

    #[test]
    fn test_remove_by_phone() {
        let mut book = ContactBook::defaults();
        let removed = book.remove("911").unwrap();
        assert_eq!(removed.name, "Emergency Services");
        assert!(matches!(
            book.remove("911"),
            Err(LifelineError::ContactNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_store_seeds_defaults() {
        let store = MemoryStore::new();
        let book = ContactBook::load(&store).await.unwrap();
        assert_eq!(book.len(), 2);
        assert_eq!(book.all()[0].phone, "911");

        // Seed was persisted, so a mutation then reload sticks
        let mut book = book;
        book.remove("112").unwrap();
        book.save(&store).await.unwrap();
        let reloaded = ContactBook::load(&store).await.unwrap();
        assert_eq!(reloaded.len(), 1);
    }
}
