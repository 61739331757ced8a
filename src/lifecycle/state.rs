use std::fmt::Debug;

pub const PAYMENTS: &str = "payments";
pub const MANDATES: &str = "mandates";
pub const SUBSCRIPTIONS: &str = "subscriptions";
pub const SIGNATURE_REQUESTS: &str = "signature_requests";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Milestone {
    Received,
    Submitted,
    Confirmed,
    Failed,
    Cancelled,
    PaidOut,
    Activated,
    Expired,
    Signed,
    Declined,
}

pub trait LifecycleStatus: Copy + Eq + Debug + Sized {
    fn as_str(self) -> &'static str;
    fn parse(raw: &str) -> Option<Self>;
    fn is_terminal(self) -> bool;
}

pub trait LifecycleAction: Copy + Debug {
    type Status: LifecycleStatus;

    fn as_str(self) -> &'static str;
    fn target(self) -> Self::Status;
    fn milestone(self) -> Milestone;
    fn allowed_from(self, current: Self::Status) -> bool;
    fn notifies(self) -> bool;
}

// ---------------------------------------------------------------- payments

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Submitted,
    Confirmed,
    Failed,
    Cancelled,
    PaidOut,
}

impl LifecycleStatus for PaymentStatus {
    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Submitted => "submitted",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::PaidOut => "paid_out",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "submitted" => Some(Self::Submitted),
            "confirmed" => Some(Self::Confirmed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            "paid_out" => Some(Self::PaidOut),
            _ => None,
        }
    }

    fn is_terminal(self) -> bool {
        matches!(self, Self::PaidOut | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentAction {
    Created,
    Submitted,
    Confirmed,
    Failed,
    Cancelled,
    PaidOut,
}

impl PaymentAction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "created" => Some(Self::Created),
            "submitted" => Some(Self::Submitted),
            "confirmed" => Some(Self::Confirmed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            "paid_out" => Some(Self::PaidOut),
            _ => None,
        }
    }
}

impl LifecycleAction for PaymentAction {
    type Status = PaymentStatus;

    fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Submitted => "submitted",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::PaidOut => "paid_out",
        }
    }

    fn target(self) -> PaymentStatus {
        match self {
            Self::Created => PaymentStatus::Pending,
            Self::Submitted => PaymentStatus::Submitted,
            Self::Confirmed => PaymentStatus::Confirmed,
            Self::Failed => PaymentStatus::Failed,
            Self::Cancelled => PaymentStatus::Cancelled,
            Self::PaidOut => PaymentStatus::PaidOut,
        }
    }

    fn milestone(self) -> Milestone {
        match self {
            Self::Created => Milestone::Received,
            Self::Submitted => Milestone::Submitted,
            Self::Confirmed => Milestone::Confirmed,
            Self::Failed => Milestone::Failed,
            Self::Cancelled => Milestone::Cancelled,
            Self::PaidOut => Milestone::PaidOut,
        }
    }

    fn allowed_from(self, current: PaymentStatus) -> bool {
        use PaymentStatus as S;
        match self {
            Self::Created => false,
            Self::Submitted => matches!(current, S::Pending | S::Failed),
            Self::Confirmed => matches!(current, S::Pending | S::Submitted),
            Self::Failed => matches!(current, S::Pending | S::Submitted),
            Self::Cancelled => matches!(current, S::Pending | S::Submitted | S::Failed),
            Self::PaidOut => matches!(current, S::Confirmed),
        }
    }

    fn notifies(self) -> bool {
        !matches!(self, Self::PaidOut)
    }
}

// ---------------------------------------------------------------- mandates

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MandateStatus {
    Created,
    Submitted,
    Active,
    Failed,
    Cancelled,
    Expired,
}

impl LifecycleStatus for MandateStatus {
    fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Submitted => "submitted",
            Self::Active => "active",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "created" => Some(Self::Created),
            "submitted" => Some(Self::Submitted),
            "active" => Some(Self::Active),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Expired)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MandateAction {
    Created,
    Submitted,
    Active,
    Failed,
    Cancelled,
    Expired,
}

impl MandateAction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "created" => Some(Self::Created),
            "submitted" => Some(Self::Submitted),
            "active" => Some(Self::Active),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }
}

impl LifecycleAction for MandateAction {
    type Status = MandateStatus;

    fn as_str(self) -> &'static str {
        self.target().as_str()
    }

    fn target(self) -> MandateStatus {
        match self {
            Self::Created => MandateStatus::Created,
            Self::Submitted => MandateStatus::Submitted,
            Self::Active => MandateStatus::Active,
            Self::Failed => MandateStatus::Failed,
            Self::Cancelled => MandateStatus::Cancelled,
            Self::Expired => MandateStatus::Expired,
        }
    }

    fn milestone(self) -> Milestone {
        match self {
            Self::Created => Milestone::Received,
            Self::Submitted => Milestone::Submitted,
            Self::Active => Milestone::Activated,
            Self::Failed => Milestone::Failed,
            Self::Cancelled => Milestone::Cancelled,
            Self::Expired => Milestone::Expired,
        }
    }

    fn allowed_from(self, current: MandateStatus) -> bool {
        use MandateStatus as S;
        match self {
            Self::Created => false,
            Self::Submitted => matches!(current, S::Created),
            Self::Active | Self::Failed => matches!(current, S::Created | S::Submitted),
            Self::Cancelled => matches!(current, S::Created | S::Submitted | S::Active | S::Failed),
            Self::Expired => matches!(current, S::Created | S::Submitted | S::Active),
        }
    }

    fn notifies(self) -> bool {
        matches!(self, Self::Active | Self::Cancelled | Self::Expired)
    }
}

// ----------------------------------------------------------- subscriptions

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Created,
    Active,
    Cancelled,
}

impl LifecycleStatus for SubscriptionStatus {
    fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Active => "active",
            Self::Cancelled => "cancelled",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "created" => Some(Self::Created),
            "active" => Some(Self::Active),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionAction {
    Created,
    Active,
    Cancelled,
}

impl SubscriptionAction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "created" => Some(Self::Created),
            "active" => Some(Self::Active),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl LifecycleAction for SubscriptionAction {
    type Status = SubscriptionStatus;

    fn as_str(self) -> &'static str {
        self.target().as_str()
    }

    fn target(self) -> SubscriptionStatus {
        match self {
            Self::Created => SubscriptionStatus::Created,
            Self::Active => SubscriptionStatus::Active,
            Self::Cancelled => SubscriptionStatus::Cancelled,
        }
    }

    fn milestone(self) -> Milestone {
        match self {
            Self::Created => Milestone::Received,
            Self::Active => Milestone::Activated,
            Self::Cancelled => Milestone::Cancelled,
        }
    }

    fn allowed_from(self, current: SubscriptionStatus) -> bool {
        match self {
            Self::Created => false,
            Self::Active => current == SubscriptionStatus::Created,
            Self::Cancelled => !current.is_terminal(),
        }
    }

    fn notifies(self) -> bool {
        false
    }
}

// ------------------------------------------------------ signature requests

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureStatus {
    Ongoing,
    Signed,
    Declined,
    Expired,
    Cancelled,
}

impl LifecycleStatus for SignatureStatus {
    fn as_str(self) -> &'static str {
        match self {
            Self::Ongoing => "ongoing",
            Self::Signed => "signed",
            Self::Declined => "declined",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ongoing" => Some(Self::Ongoing),
            "signed" => Some(Self::Signed),
            "declined" => Some(Self::Declined),
            "expired" => Some(Self::Expired),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    fn is_terminal(self) -> bool {
        !matches!(self, Self::Ongoing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAction {
    Activated,
    Done,
    Declined,
    Expired,
    Cancelled,
}

impl SignatureAction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "activated" => Some(Self::Activated),
            "done" | "completed" => Some(Self::Done),
            "declined" => Some(Self::Declined),
            "expired" => Some(Self::Expired),
            "canceled" | "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl LifecycleAction for SignatureAction {
    type Status = SignatureStatus;

    fn as_str(self) -> &'static str {
        match self {
            Self::Activated => "activated",
            Self::Done => "done",
            Self::Declined => "declined",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }

    fn target(self) -> SignatureStatus {
        match self {
            Self::Activated => SignatureStatus::Ongoing,
            Self::Done => SignatureStatus::Signed,
            Self::Declined => SignatureStatus::Declined,
            Self::Expired => SignatureStatus::Expired,
            Self::Cancelled => SignatureStatus::Cancelled,
        }
    }

    fn milestone(self) -> Milestone {
        match self {
            Self::Activated => Milestone::Activated,
            Self::Done => Milestone::Signed,
            Self::Declined => Milestone::Declined,
            Self::Expired => Milestone::Expired,
            Self::Cancelled => Milestone::Cancelled,
        }
    }

    fn allowed_from(self, current: SignatureStatus) -> bool {
        match self {
            Self::Activated => false,
            _ => current == SignatureStatus::Ongoing,
        }
    }

    fn notifies(self) -> bool {
        matches!(self, Self::Done | Self::Declined | Self::Expired)
    }
}

// ---------------------------------------------------------------- dispatch

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceEvent {
    Payment(PaymentAction),
    Mandate(MandateAction),
    Subscription(SubscriptionAction),
    Unrecognized,
}

impl ResourceEvent {
    pub fn classify(resource_type: &str, action: &str) -> Self {
        let classified = match resource_type {
            PAYMENTS => PaymentAction::parse(action).map(Self::Payment),
            MANDATES => MandateAction::parse(action).map(Self::Mandate),
            SUBSCRIPTIONS => SubscriptionAction::parse(action).map(Self::Subscription),
            _ => None,
        };
        classified.unwrap_or(Self::Unrecognized)
    }

    pub fn notifies(self) -> bool {
        match self {
            Self::Payment(action) => action.notifies(),
            Self::Mandate(action) => action.notifies(),
            Self::Subscription(action) => action.notifies(),
            Self::Unrecognized => false,
        }
    }
}
