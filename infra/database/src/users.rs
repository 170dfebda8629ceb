use crate::error::{DatabaseError, DatabaseErrorExt};
use crate::models::{Id, User};
use crate::{Database, ROW, table, transaction};

impl Database {
    pub async fn user(&self, id: Id) -> Result<Option<User>, DatabaseError> {
        self.select_key(table::USER, id).await
    }

    /// Every user, ascending by id.
    pub async fn users(&self) -> Result<Vec<User>, DatabaseError> {
        self.select_all(table::USER).await
    }

    pub async fn user_by_name(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let users = self
            .query(format!("SELECT {ROW} FROM user WHERE username = $username LIMIT 1"))
            .bind(("username", username.to_owned()))
            .await
            .context("Looking up user")?
            .take::<Vec<User>>(0)?;
        Ok(users.into_iter().next())
    }

    /// # Errors
    /// [`DatabaseError::Constraint`] when the username is taken.
    pub async fn insert_user(&self, mut user: User) -> Result<Id, DatabaseError> {
        if self.user_by_name(&user.username).await?.is_some() {
            return Err(taken(&user.username));
        }
        user.id = self.next_id(table::USER).await?;
        let id = user.id;
        let username = user.username.clone();

        let outcome = async {
            self.query(transaction(&["INSERT INTO user $user"]))
                .bind(("user", user))
                .await?
                .check()
                .map_err(surrealdb::Error::from)?;
            Ok::<_, DatabaseError>(())
        }
        .await;
        if let Err(err) = outcome {
            return Err(match self.user_by_name(&username).await {
                Ok(Some(_)) => taken(&username),
                _ => err,
            });
        }
        Ok(id)
    }
}

fn taken(username: &str) -> DatabaseError {
    DatabaseError::Constraint { message: format!("username '{username}' already exists").into(), context: None }
}
