//! 运行级取消信号
//!
//! 所有无限等待都必须和取消信号竞争，避免进程永久挂起。

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;

use super::page_driver::{DriverError, DriverResult};
use crate::error::AppError;

/// 取消触发端（由 main 持有）
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// 取消监听端，可任意 clone 传给各组件
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

/// 创建一对取消句柄
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl CancelSignal {
    /// 永远不会触发的信号
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        // 发送端丢弃后 rx 只会保持 false
        drop(tx);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// 等待取消；发送端已丢弃时永不返回
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// 让 `fut` 与取消信号竞争
    pub async fn guard<F, T>(&self, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = T>,
    {
        if self.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(AppError::Cancelled),
            value = fut => Ok(value),
        }
    }

    /// 可取消的驱动操作，驱动错误交给 `map` 归类
    pub async fn driver<F, T>(
        &self,
        fut: F,
        map: impl FnOnce(DriverError) -> AppError,
    ) -> Result<T, AppError>
    where
        F: Future<Output = DriverResult<T>>,
    {
        self.guard(fut).await?.map_err(map)
    }

    /// 可取消的延时
    pub async fn sleep(&self, duration: Duration) -> Result<(), AppError> {
        self.guard(tokio::time::sleep(duration)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_guard_passes_value_through() {
        let signal = CancelSignal::never();
        let value = signal.guard(async { 42 }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_guard_aborts_pending_future() {
        let (handle, signal) = cancel_pair();
        let waiter = tokio::spawn(async move {
            signal.guard(std::future::pending::<()>()).await
        });
        handle.cancel();
        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(AppError::Cancelled)));
    }

    #[tokio::test]
    async fn test_already_cancelled_short_circuits() {
        let (handle, signal) = cancel_pair();
        handle.cancel();
        assert!(signal.is_cancelled());
        assert!(matches!(
            signal.sleep(Duration::from_secs(3600)).await,
            Err(AppError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn test_driver_maps_errors() {
        let signal = CancelSignal::never();
        let result: Result<(), AppError> = signal
            .driver(async { Err(DriverError::Script("boom".into())) }, |source| {
                AppError::PageTransition { page: 2, source }
            })
            .await;
        assert!(matches!(result, Err(AppError::PageTransition { page: 2, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_completes_without_cancel() {
        let signal = CancelSignal::never();
        let start = tokio::time::Instant::now();
        signal.sleep(Duration::from_secs(1)).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(1));
    }
}
