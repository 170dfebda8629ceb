use crate::error::{DatabaseError, DatabaseErrorExt};
use crate::models::{CognitiveAtlasTask, ExperimentTemplate, ExperimentVariable, Id};
use crate::{Database, ROW, key, now, table, transaction};
use tracing::{debug, info};

/// A template together with the task and variables its package declares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTemplate {
    pub template: ExperimentTemplate,
    /// Reused when a task with the same `cog_atlas_id` exists.
    pub task: Option<CognitiveAtlasTask>,
    pub performance_variable: Option<ExperimentVariable>,
    pub rejection_variable: Option<ExperimentVariable>,
}

impl Database {
    pub async fn template(&self, id: Id) -> Result<Option<ExperimentTemplate>, DatabaseError> {
        self.select_key(table::TEMPLATE, id).await
    }

    /// Every installed template, ascending by id.
    pub async fn templates(&self) -> Result<Vec<ExperimentTemplate>, DatabaseError> {
        self.select_all(table::TEMPLATE).await
    }

    pub async fn templates_in(&self, ids: &[Id]) -> Result<Vec<ExperimentTemplate>, DatabaseError> {
        self.select_keys(table::TEMPLATE, ids).await
    }

    pub async fn template_by_tag(&self, tag: &str) -> Result<Option<ExperimentTemplate>, DatabaseError> {
        let found = self
            .query(format!("SELECT {ROW} FROM experiment_template WHERE tag = $tag LIMIT 1"))
            .bind(("tag", tag.to_owned()))
            .await
            .context("Looking up template tag")?
            .take::<Vec<ExperimentTemplate>>(0)?;
        Ok(found.into_iter().next())
    }

    pub async fn task(&self, id: Id) -> Result<Option<CognitiveAtlasTask>, DatabaseError> {
        self.select_key(table::TASK, id).await
    }

    pub async fn task_by_atlas_id(&self, cog_atlas_id: &str) -> Result<Option<CognitiveAtlasTask>, DatabaseError> {
        let found = self
            .query(format!("SELECT {ROW} FROM cognitive_atlas_task WHERE cog_atlas_id = $cog_atlas_id LIMIT 1"))
            .bind(("cog_atlas_id", cog_atlas_id.to_owned()))
            .await
            .context("Looking up cognitive atlas task")?
            .take::<Vec<CognitiveAtlasTask>>(0)?;
        Ok(found.into_iter().next())
    }

    pub async fn variable(&self, id: Id) -> Result<Option<ExperimentVariable>, DatabaseError> {
        self.select_key(table::VARIABLE, id).await
    }

    pub async fn variables_in(&self, ids: &[Id]) -> Result<Vec<ExperimentVariable>, DatabaseError> {
        self.select_keys(table::VARIABLE, ids).await
    }

    /// Records a template with its task and variables in one transaction, stamping its
    /// dates when unset.
    ///
    /// The tag is claimed by the unique `template_tag` index: of two concurrent calls for
    /// the same tag exactly one commits.
    ///
    /// # Errors
    /// [`DatabaseError::Constraint`] when the tag is already installed.
    pub async fn insert_template(&self, new: NewTemplate) -> Result<Id, DatabaseError> {
        let NewTemplate { mut template, task, performance_variable, rejection_variable } = new;
        if self.template_by_tag(&template.tag).await?.is_some() {
            return Err(tag_taken(&template.tag));
        }

        let mut statements = Vec::new();
        let task = match task {
            Some(task) => match self.task_by_atlas_id(&task.cog_atlas_id).await? {
                Some(existing) => {
                    template.cognitive_atlas_task = Some(existing.id);
                    None
                },
                None => {
                    let id = self.next_id(table::TASK).await?;
                    template.cognitive_atlas_task = Some(id);
                    statements.push("INSERT INTO cognitive_atlas_task $task");
                    Some(CognitiveAtlasTask { id, ..task })
                },
            },
            None => None,
        };
        let performance_variable = match performance_variable {
            Some(variable) => {
                let id = self.next_id(table::VARIABLE).await?;
                template.performance_variable = Some(id);
                statements.push("INSERT INTO experiment_variable $performance");
                Some(ExperimentVariable { id, ..variable })
            },
            None => None,
        };
        let rejection_variable = match rejection_variable {
            Some(variable) => {
                let id = self.next_id(table::VARIABLE).await?;
                template.rejection_variable = Some(id);
                statements.push("INSERT INTO experiment_variable $rejection");
                Some(ExperimentVariable { id, ..variable })
            },
            None => None,
        };

        template.id = self.next_id(table::TEMPLATE).await?;
        let stamp = now();
        if template.add_date == 0 {
            template.add_date = stamp;
        }
        if template.modify_date == 0 {
            template.modify_date = stamp;
        }
        statements.push("INSERT INTO experiment_template $template");

        let id = template.id;
        let tag = template.tag.clone();
        let outcome = async {
            self.query(transaction(&statements))
                .bind(("task", task))
                .bind(("performance", performance_variable))
                .bind(("rejection", rejection_variable))
                .bind(("template", template))
                .await?
                .check()
                .map_err(surrealdb::Error::from)?;
            Ok::<_, DatabaseError>(())
        }
        .await;

        if let Err(err) = outcome {
            return Err(match self.template_by_tag(&tag).await {
                Ok(Some(_)) => tag_taken(&tag),
                _ => err,
            });
        }
        debug!(template = id, tag = %tag, "Template recorded");
        Ok(id)
    }

    /// Writes the editable fields of `template` and bumps its modify date.
    ///
    /// # Errors
    /// [`DatabaseError::NotFound`] when the template is gone.
    pub async fn update_template(&self, template: &ExperimentTemplate) -> Result<(), DatabaseError> {
        let Some(record) = key(table::TEMPLATE, template.id) else {
            return Err(missing_template(template.id));
        };
        let updated = self
            .query(transaction(&[format!(
                "UPDATE {record} SET name = $name, publish = $publish, reference = $reference, \
                 `time` = $time, modify_date = $modify_date RETURN VALUE record::id(id)"
            )]))
            .bind(("name", template.name.clone()))
            .bind(("publish", template.publish))
            .bind(("reference", template.reference.clone()))
            .bind(("time", template.time))
            .bind(("modify_date", now()))
            .await
            .context("Updating template")?
            .take::<Vec<Id>>(0)?;
        if updated.is_empty() {
            return Err(missing_template(template.id));
        }
        Ok(())
    }

    /// Deletes a template and, when it was its task's last template, the task too.
    ///
    /// Experiments built on the template go with it, together with their results and
    /// their places in batteries.
    pub async fn delete_template(&self, id: Id) -> Result<Option<ExperimentTemplate>, DatabaseError> {
        let Some(template) = self.template(id).await? else {
            return Ok(None);
        };
        let mut statements = vec![format!("DELETE experiment_template:{id}")];
        if let Some(task) = template.cognitive_atlas_task.filter(|task| *task > 0) {
            statements.push(format!(
                "IF array::len(SELECT VALUE id FROM experiment_template WHERE cognitive_atlas_task = {task}) = 0 \
                 {{ DELETE cognitive_atlas_task:{task} }}"
            ));
        }
        self.query(transaction(&statements))
            .await
            .context(format!("Deleting template {id}"))?
            .check()
            .map_err(surrealdb::Error::from)?;
        info!(template = id, tag = %template.tag, "Experiment template deleted");
        Ok(Some(template))
    }
}

fn tag_taken(tag: &str) -> DatabaseError {
    DatabaseError::Constraint { message: format!("template tag '{tag}' already exists").into(), context: None }
}

fn missing_template(id: Id) -> DatabaseError {
    DatabaseError::NotFound { message: format!("experiment template {id}").into(), context: None }
}
