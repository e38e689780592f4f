use chrono::Duration;
use std::sync::Arc;
use tracing::{Instrument, error, info, instrument, warn};

use crate::clock::Clock;
use crate::error::{UserError, UserResult};
use crate::models::{
    CODE_EXPIRE_MINUTES, CODE_LENGTH, CodePurpose, NewVerificationCode, SEND_INTERVAL_SECONDS,
    TargetType,
};
use crate::notify::{CodeSenders, DISPATCH_TIMEOUT};
use crate::repository::VerificationCodeRepository;

/// Issues and consumes single-use verification codes.
#[derive(Clone)]
pub struct VerificationService {
    codes: Arc<dyn VerificationCodeRepository>,
    senders: CodeSenders,
    clock: Arc<dyn Clock>,
    dispatch_timeout: std::time::Duration,
}

/// Uniform numeric code; leading zeros allowed.
pub fn generate_code() -> String {
    let upper = 10u32.pow(CODE_LENGTH as u32);
    format!("{:0width$}", rand::random_range(0..upper), width = CODE_LENGTH)
}

impl VerificationService {
    pub fn new(
        codes: Arc<dyn VerificationCodeRepository>,
        senders: CodeSenders,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            codes,
            senders,
            clock,
            dispatch_timeout: DISPATCH_TIMEOUT,
        }
    }

    pub fn with_dispatch_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.dispatch_timeout = timeout;
        self
    }

    /// Generate, store and deliver a code for `target`.
    ///
    /// Rejected when a code for the same target and purpose was issued less than
    /// a minute ago. A failed or timed-out delivery removes the stored code again.
    /// Issuance runs on its own task, so it completes even when the caller is
    /// dropped halfway through.
    #[instrument(skip(self, target))]
    pub async fn send_code(&self, target: &str, purpose: CodePurpose) -> UserResult<()> {
        let target = target.trim();
        if target.is_empty() {
            return Err(UserError::Validation("phone or email is required".to_string()));
        }

        let target_type = TargetType::classify(target).ok_or_else(|| {
            UserError::Validation("enter a valid phone number or email address".to_string())
        })?;

        let now = self.clock.now();
        let new_code = NewVerificationCode {
            target: target.to_string(),
            target_type,
            code: generate_code(),
            purpose,
            expire_time: now + Duration::minutes(CODE_EXPIRE_MINUTES),
            create_time: now,
        };
        let window_start = now - Duration::seconds(SEND_INTERVAL_SECONDS);

        let codes = self.codes.clone();
        let senders = self.senders.clone();
        let dispatch_timeout = self.dispatch_timeout;

        tokio::spawn(async move {
            let target = new_code.target.clone();
            let code = new_code.code.clone();
            let id = codes
                .insert_unless_recent(new_code, window_start)
                .await?
                .ok_or(UserError::RateLimited)?;

            let delivery = senders.for_target(target_type).send(&target, &code);
            let failure = match tokio::time::timeout(dispatch_timeout, delivery).await {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(_) => Some(format!("delivery timed out after {dispatch_timeout:?}")),
            };

            if let Some(reason) = failure {
                warn!(code_id = id, error = %reason, "Dispatch failed, discarding verification code");
                if let Err(e) = codes.delete(id).await {
                    error!(code_id = id, error = %e, "Failed to discard undelivered verification code");
                }
                return Err(UserError::SendFailed(reason));
            }

            info!(code_id = id, %target_type, "Verification code issued");
            Ok::<(), UserError>(())
        }
        .in_current_span())
        .await
        .map_err(|e| UserError::Internal(format!("code issuance task failed: {e}")))?
    }

    /// Consume the newest valid code for (target, purpose). Expired, used and wrong
    /// codes are indistinguishable.
    #[instrument(skip(self, target, code))]
    pub async fn verify_code(
        &self,
        target: &str,
        code: &str,
        purpose: CodePurpose,
    ) -> UserResult<bool> {
        self.codes
            .consume(target, purpose, code.trim(), self.clock.now())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::notify::{CodeSender, MockCodeSender, SendError};
    use crate::repository::{InMemoryVerificationCodeRepository, MockVerificationCodeRepository};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration as StdDuration;

    fn senders(sms: MockCodeSender) -> CodeSenders {
        let email: Arc<dyn CodeSender> = Arc::new(MockCodeSender::new());
        CodeSenders::new(Arc::new(sms), email)
    }

    fn accepting_sender() -> MockCodeSender {
        let mut sms = MockCodeSender::new();
        sms.expect_send().returning(|_, _| Ok(()));
        sms
    }

    #[test]
    fn test_generate_code_is_six_digits() {
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn test_send_code_rejects_blank_and_malformed_targets() {
        let service = VerificationService::new(
            Arc::new(MockVerificationCodeRepository::new()),
            senders(MockCodeSender::new()),
            Arc::new(ManualClock::default()),
        );

        let err = service.send_code("   ", CodePurpose::Register).await.unwrap_err();
        assert_eq!(err.to_string(), "phone or email is required");

        let err = service.send_code("12345", CodePurpose::Register).await.unwrap_err();
        assert_eq!(err.to_string(), "enter a valid phone number or email address");
    }

    #[tokio::test]
    async fn test_second_send_within_interval_is_rate_limited() {
        let clock = ManualClock::default();
        let service = VerificationService::new(
            Arc::new(InMemoryVerificationCodeRepository::new()),
            senders(accepting_sender()),
            Arc::new(clock.clone()),
        );

        service.send_code("13800138000", CodePurpose::Register).await.unwrap();

        clock.advance(Duration::seconds(59));
        let err = service.send_code("13800138000", CodePurpose::Register).await.unwrap_err();
        assert!(matches!(err, UserError::RateLimited));

        // Other purposes have their own window.
        service.send_code("13800138000", CodePurpose::ResetPassword).await.unwrap();

        clock.advance(Duration::seconds(2));
        service.send_code("13800138000", CodePurpose::Register).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_dispatch_removes_code() {
        let repo = InMemoryVerificationCodeRepository::new();
        let mut sms = MockCodeSender::new();
        let mut calls = 0;
        sms.expect_send().times(2).returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Err(SendError::Smtp("connection reset".into()))
            } else {
                Ok(())
            }
        });

        let service = VerificationService::new(
            Arc::new(repo.clone()),
            senders(sms),
            Arc::new(ManualClock::default()),
        );

        let err = service.send_code("13800138000", CodePurpose::Register).await.unwrap_err();
        assert!(matches!(err, UserError::SendFailed(_)));
        assert!(repo.codes_for("13800138000").await.is_empty());

        // Nothing left behind, so no rate limit either.
        service.send_code("13800138000", CodePurpose::Register).await.unwrap();
        assert_eq!(repo.codes_for("13800138000").await.len(), 1);
    }

    /// Never answers the first call; later calls succeed.
    #[derive(Default)]
    struct StallsOnce(AtomicBool);

    #[async_trait::async_trait]
    impl CodeSender for StallsOnce {
        async fn send(&self, _target: &str, _code: &str) -> Result<(), SendError> {
            if !self.0.swap(true, Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_abandoned_send_still_discards_undelivered_code() {
        let repo = InMemoryVerificationCodeRepository::new();
        let email: Arc<dyn CodeSender> = Arc::new(MockCodeSender::new());
        let service = VerificationService::new(
            Arc::new(repo.clone()),
            CodeSenders::new(Arc::new(StallsOnce::default()), email),
            Arc::new(ManualClock::default()),
        )
        .with_dispatch_timeout(StdDuration::from_millis(100));

        // Caller gives up while the gateway hangs.
        let abandoned = tokio::time::timeout(
            StdDuration::from_millis(20),
            service.send_code("13800138000", CodePurpose::Register),
        )
        .await;
        assert!(abandoned.is_err());

        tokio::time::sleep(StdDuration::from_millis(300)).await;
        assert!(repo.codes_for("13800138000").await.is_empty());

        service.send_code("13800138000", CodePurpose::Register).await.unwrap();
        assert_eq!(repo.codes_for("13800138000").await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_cleanup_keeps_send_failure() {
        let mut repo = MockVerificationCodeRepository::new();
        repo.expect_insert_unless_recent()
            .times(1)
            .returning(|_, _| Ok(Some(9)));
        repo.expect_delete()
            .withf(|id| *id == 9)
            .times(1)
            .returning(|_| Err(UserError::Internal("connection lost".to_string())));

        let mut sms = MockCodeSender::new();
        sms.expect_send().returning(|_, _| {
            Err(SendError::Gateway {
                status: 502,
                body: "bad gateway".to_string(),
            })
        });

        let service =
            VerificationService::new(Arc::new(repo), senders(sms), Arc::new(ManualClock::default()));

        let err = service.send_code("13800138000", CodePurpose::Register).await.unwrap_err();
        match err {
            UserError::SendFailed(reason) => assert!(reason.contains("502")),
            other => panic!("expected SendFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_code_expires_after_five_minutes() {
        let repo = InMemoryVerificationCodeRepository::new();
        let clock = ManualClock::default();
        let service = VerificationService::new(
            Arc::new(repo.clone()),
            senders(accepting_sender()),
            Arc::new(clock.clone()),
        );

        service.send_code("13800138000", CodePurpose::Register).await.unwrap();
        let code = repo.codes_for("13800138000").await[0].code.clone();

        clock.advance(Duration::minutes(5));
        let ok = service
            .verify_code("13800138000", &code, CodePurpose::Register)
            .await
            .unwrap();
        assert!(!ok);
    }

    #[tokio::test]
    async fn test_code_is_single_use() {
        let repo = InMemoryVerificationCodeRepository::new();
        let clock = ManualClock::default();
        let service = VerificationService::new(
            Arc::new(repo.clone()),
            senders(accepting_sender()),
            Arc::new(clock.clone()),
        );

        service.send_code("13800138000", CodePurpose::Register).await.unwrap();
        let code = repo.codes_for("13800138000").await[0].code.clone();
        clock.advance(Duration::minutes(4));

        assert!(service.verify_code("13800138000", &code, CodePurpose::Register).await.unwrap());
        assert!(!service.verify_code("13800138000", &code, CodePurpose::Register).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_passes_clock_time_to_repository() {
        let clock = ManualClock::default();
        let now = clock.now();
        let mut repo = MockVerificationCodeRepository::new();
        repo.expect_consume()
            .withf(move |target, purpose, code, at| {
                target == "a@b.io"
                    && *purpose == CodePurpose::ResetPassword
                    && code == "123456"
                    && *at == now
            })
            .times(1)
            .returning(|_, _, _, _| Ok(true));

        let service = VerificationService::new(
            Arc::new(repo),
            senders(MockCodeSender::new()),
            Arc::new(clock),
        );

        assert!(service
            .verify_code("a@b.io", " 123456 ", CodePurpose::ResetPassword)
            .await
            .unwrap());
    }
}
