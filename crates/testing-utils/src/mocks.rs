//! In-memory mock repositories
//!
//! Mirror the semantics of the SQLite implementations closely enough for
//! scheduler-level tests: id allocation, status transition checks, stale
//! reclamation and soft completion failures all behave the same way.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use calc_domain::{
    Expression, ExpressionRepository, ExpressionStatus, NewTask, Task, TaskCompletion,
    TaskRepository,
};
use calc_errors::{CalcError, CalcResult};
use chrono::{Duration, Utc};

pub struct MockExpressionRepository {
    state: Mutex<HashMap<i64, Expression>>,
    next_id: AtomicI64,
}

impl MockExpressionRepository {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Read an expression without the owner filter (test-only backdoor)
    pub async fn get_any(&self, id: i64) -> Option<Expression> {
        self.state.lock().unwrap().get(&id).cloned()
    }

    /// Pre-seed an expression with explicit fields
    pub fn insert(&self, expression: Expression) {
        let mut state = self.state.lock().unwrap();
        let next = self.next_id.load(Ordering::SeqCst).max(expression.id + 1);
        self.next_id.store(next, Ordering::SeqCst);
        state.insert(expression.id, expression);
    }
}

impl Default for MockExpressionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExpressionRepository for MockExpressionRepository {
    async fn create(&self, user_id: i64, text: &str) -> CalcResult<Expression> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let expression = Expression {
            id,
            user_id,
            expression: text.to_string(),
            status: ExpressionStatus::Pending,
            result: None,
            created_at: Utc::now(),
        };
        self.state
            .lock()
            .unwrap()
            .insert(id, expression.clone());
        Ok(expression)
    }

    async fn get_by_id(&self, id: i64, user_id: i64) -> CalcResult<Option<Expression>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .get(&id)
            .filter(|e| e.user_id == user_id)
            .cloned())
    }

    async fn list_for_user(&self, user_id: i64) -> CalcResult<Vec<Expression>> {
        let mut found: Vec<Expression> = self
            .state
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(found)
    }

    async fn update_status(
        &self,
        id: i64,
        status: ExpressionStatus,
        result: Option<f64>,
    ) -> CalcResult<()> {
        let mut state = self.state.lock().unwrap();
        let expression = state
            .get_mut(&id)
            .ok_or_else(|| CalcError::expression_not_found(id))?;
        if !expression.status.can_transition_to(status) {
            return Err(CalcError::InvalidStatusTransition {
                from: expression.status.to_string(),
                to: status.to_string(),
            });
        }
        expression.status = status;
        expression.result = result;
        Ok(())
    }

    async fn get_unfinished(&self) -> CalcResult<Vec<Expression>> {
        let mut found: Vec<Expression> = self
            .state
            .lock()
            .unwrap()
            .values()
            .filter(|e| !e.status.is_terminal())
            .cloned()
            .collect();
        found.sort_by_key(|e| e.id);
        Ok(found)
    }

    async fn delete(&self, id: i64, user_id: i64) -> CalcResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.get(&id).is_some_and(|e| e.user_id == user_id) {
            state.remove(&id);
        }
        Ok(())
    }
}

pub struct MockTaskRepository {
    state: Mutex<Vec<Task>>,
    next_id: AtomicI64,
}

impl MockTaskRepository {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// All tasks in id order
    pub async fn all(&self) -> Vec<Task> {
        let mut tasks = self.state.lock().unwrap().clone();
        tasks.sort_by_key(|t| t.id);
        tasks
    }

    /// Pre-seed a task with explicit fields
    pub fn insert(&self, task: Task) {
        let mut state = self.state.lock().unwrap();
        let next = self.next_id.load(Ordering::SeqCst).max(task.id + 1);
        self.next_id.store(next, Ordering::SeqCst);
        state.push(task);
    }
}

impl Default for MockTaskRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskRepository for MockTaskRepository {
    async fn create(&self, task: &NewTask) -> CalcResult<Task> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let task = Task {
            id,
            expression_id: task.expression_id,
            arg1: task.arg1,
            arg2: task.arg2,
            operation: task.operation,
            operation_time_ms: task.operation_time_ms,
            started_at: None,
            completed: false,
            result: None,
        };
        self.state.lock().unwrap().push(task.clone());
        Ok(task)
    }

    async fn claim_next(&self, stale_after: Duration) -> CalcResult<Option<Task>> {
        let now = Utc::now();
        let cutoff = now - stale_after;
        let mut state = self.state.lock().unwrap();

        let claimable = state
            .iter_mut()
            .filter(|t| !t.completed && t.started_at.map_or(true, |s| s <= cutoff))
            .min_by_key(|t| t.id);

        match claimable {
            Some(task) => {
                task.started_at = Some(now);
                Ok(Some(task.clone()))
            }
            None => Ok(None),
        }
    }

    async fn complete(&self, task_id: i64, result: f64) -> CalcResult<Option<TaskCompletion>> {
        let mut state = self.state.lock().unwrap();

        let Some(task) = state.iter_mut().find(|t| t.id == task_id && !t.completed) else {
            return Ok(None);
        };
        task.completed = true;
        task.result = Some(result);
        let task = task.clone();

        let siblings_remaining = state
            .iter()
            .filter(|t| t.expression_id == task.expression_id && !t.completed)
            .count() as i64;

        Ok(Some(TaskCompletion {
            task,
            siblings_remaining,
        }))
    }

    async fn get_by_id(&self, id: i64) -> CalcResult<Option<Task>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn get_by_expression(&self, expression_id: i64) -> CalcResult<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .state
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.expression_id == expression_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.id);
        Ok(tasks)
    }

    async fn count_pending(&self) -> CalcResult<i64> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .iter()
            .filter(|t| !t.completed)
            .count() as i64)
    }

    async fn count_completed(&self) -> CalcResult<i64> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.completed)
            .count() as i64)
    }
}
