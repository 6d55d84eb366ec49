use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::User;

pub trait UserStore: Send + Sync {
    /// owned snapshot of the record for the given username
    fn get(&self, username: &str) -> Option<User>;

    /// inserts the record when the username is free. returns false when the
    /// username is already taken
    fn create(&self, user: User) -> bool;

    /// runs `op` with exclusive access to the record, serializing
    /// read-modify-write sequences for the same username. returns false when
    /// the username is unknown
    fn modify(&self, username: &str, op: &mut dyn FnMut(&mut User)) -> bool;

    /// owned snapshot of every record
    fn retrieve(&self) -> Vec<User>;
}

pub struct MemoryStore {
    users: DashMap<String, User>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore {
            users: DashMap::new(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

impl UserStore for MemoryStore {
    fn get(&self, username: &str) -> Option<User> {
        self.users.get(username).map(|found| found.value().clone())
    }

    fn create(&self, user: User) -> bool {
        match self.users.entry(user.username.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(user);

                true
            }
        }
    }

    fn modify(&self, username: &str, op: &mut dyn FnMut(&mut User)) -> bool {
        if let Some(mut found) = self.users.get_mut(username) {
            op(found.value_mut());

            true
        } else {
            false
        }
    }

    fn retrieve(&self) -> Vec<User> {
        self.users.iter().map(|found| found.value().clone()).collect()
    }
}
