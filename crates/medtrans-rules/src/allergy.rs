//! 过敏冲突检测
//!
//! 将拟用药物名称与患者过敏清单比对，匹配规则为不区分大小写的双向子串包含：
//! 药物名包含过敏原，或过敏原包含药物名。规则有意宽松，宁可误报也不漏报，
//! 例如 "latex" 会匹配 "Latex-free glove adhesive"。
//!
//! 给药流程中的三个检查点（输入时、从候选列表选择时、最终提交前）调用同一个
//! 纯函数 [`match_allergy`]，只是对结果的处理方式不同。

use chrono::{DateTime, Utc};
use medtrans_core::utils::normalize_name;
use medtrans_core::{Allergy, MedicationAdministration, MedicationRequest, Patient, Result, RulesError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 返回第一个与药物名匹配的过敏记录
pub fn match_allergy<'a>(allergies: &'a [Allergy], candidate_name: &str) -> Option<&'a Allergy> {
    let candidate = normalize_name(candidate_name);
    if candidate.is_empty() {
        return None;
    }

    allergies.iter().find(|allergy| {
        let allergen = normalize_name(&allergy.allergen);
        !allergen.is_empty() && (candidate.contains(&allergen) || allergen.contains(&candidate))
    })
}

/// 给药流程检查点
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Checkpoint {
    Keystroke,  // 输入药名时实时提示
    Selection,  // 从候选列表选择
    Submission, // 最终提交
}

impl Checkpoint {
    /// 该检查点发现冲突时是否阻断
    pub fn blocks(&self) -> bool {
        !matches!(self, Checkpoint::Keystroke)
    }
}

/// 检查点结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GateOutcome {
    Clear,
    Warn { allergy: Allergy },
    Block { allergy: Allergy },
}

impl GateOutcome {
    pub fn is_blocked(&self) -> bool {
        matches!(self, GateOutcome::Block { .. })
    }

    pub fn conflict(&self) -> Option<&Allergy> {
        match self {
            GateOutcome::Clear => None,
            GateOutcome::Warn { allergy } | GateOutcome::Block { allergy } => Some(allergy),
        }
    }
}

/// 给药闸门
#[derive(Debug, Clone, Default)]
pub struct MedicationGate;

impl MedicationGate {
    pub fn new() -> Self {
        Self
    }

    /// 在指定检查点检查药名
    pub fn check(&self, allergies: &[Allergy], candidate_name: &str, checkpoint: Checkpoint) -> GateOutcome {
        match match_allergy(allergies, candidate_name) {
            None => GateOutcome::Clear,
            Some(allergy) if checkpoint.blocks() => {
                tracing::warn!(
                    "Medication {:?} blocked at {:?}: matches allergen {:?}",
                    candidate_name,
                    checkpoint,
                    allergy.allergen
                );
                GateOutcome::Block {
                    allergy: allergy.clone(),
                }
            }
            Some(allergy) => GateOutcome::Warn {
                allergy: allergy.clone(),
            },
        }
    }

    /// 校验申请并执行提交前检查，通过后生成给药记录
    pub fn administer(
        &self,
        patient: &Patient,
        request: &MedicationRequest,
        actor: &str,
    ) -> Result<MedicationAdministration> {
        self.administer_at(patient, request, actor, Utc::now())
    }

    /// 同 [`administer`](Self::administer)，使用指定的给药时间
    pub fn administer_at(
        &self,
        patient: &Patient,
        request: &MedicationRequest,
        actor: &str,
        administered_at: DateTime<Utc>,
    ) -> Result<MedicationAdministration> {
        validate_request(request)?;

        if let GateOutcome::Block { allergy } =
            self.check(&patient.allergies, &request.medication_name, Checkpoint::Submission)
        {
            return Err(RulesError::AllergyConflict {
                allergen: allergy.allergen,
                severity: allergy.severity,
                medication: request.medication_name.clone(),
            });
        }

        let administration = MedicationAdministration {
            id: Uuid::new_v4(),
            patient_ref: patient.id,
            medication_name: request.medication_name.trim().to_string(),
            dosage: request.dosage,
            unit: request.unit.trim().to_string(),
            route: request.route.clone(),
            administered_at,
            administered_by: actor.to_string(),
            notes: request.notes.clone(),
        };

        tracing::info!(
            "Medication {} {} {} administered to patient {} by {}",
            administration.medication_name,
            administration.dosage,
            administration.unit,
            patient.id,
            actor
        );

        Ok(administration)
    }
}

fn validate_request(request: &MedicationRequest) -> Result<()> {
    if request.medication_name.trim().is_empty() {
        return Err(RulesError::InvalidInput("medication name is required".to_string()));
    }
    if !request.dosage.is_finite() || request.dosage <= 0.0 {
        return Err(RulesError::InvalidInput(format!(
            "dosage must be a positive number, got {}",
            request.dosage
        )));
    }
    if request.unit.trim().is_empty() {
        return Err(RulesError::InvalidInput("dosage unit is required".to_string()));
    }
    Ok(())
}
