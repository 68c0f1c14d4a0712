//! Task trait - ハンドラ束縛を持たない単体の作業
//!
//! Task は型キーで指定され、`TaskParams` を受け取って実行される。

use async_trait::async_trait;

use crate::domain::{CourierResult, TaskParams};

/// Task は `taskQueue` パラメータで指定される作業単位
///
/// # 使用例
/// ```ignore
/// struct RebuildReport;
///
/// #[async_trait]
/// impl Task for RebuildReport {
///     const TYPE: &'static str = "reports.rebuild.v1";
///
///     async fn execute(&self, params: TaskParams) -> CourierResult<()> {
///         let year = params.get_int("year")?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    const TYPE: &'static str;

    async fn execute(&self, params: TaskParams) -> CourierResult<()>;
}

/// Object-safe な Task
#[async_trait]
pub trait AsyncTask: Send + Sync {
    async fn execute_dyn(&self, params: TaskParams) -> CourierResult<()>;

    fn task_type(&self) -> &str;
}

pub struct TypedTask<T> {
    task: T,
}

impl<T: Task> TypedTask<T> {
    pub fn new(task: T) -> Self {
        Self { task }
    }
}

#[async_trait]
impl<T: Task> AsyncTask for TypedTask<T> {
    async fn execute_dyn(&self, params: TaskParams) -> CourierResult<()> {
        self.task.execute(params).await
    }

    fn task_type(&self) -> &str {
        T::TYPE
    }
}
