use tfa_api::error::{AuthKind, UserKind};
use tfa_api::users::ListItem;

use crate::error::{self, Error};
use crate::sec::authn::totp::qr;
use crate::state::Shared;

pub fn retrieve(state: &Shared) -> Vec<ListItem> {
    let mut list: Vec<ListItem> = state.users()
        .retrieve()
        .into_iter()
        .map(|user| ListItem {
            totp_enabled: user.totp.is_some(),
            created: user.created,
            username: user.username,
        })
        .collect();

    list.sort_by(|a, b| a.username.cmp(&b.username));

    list
}

pub fn provisioning_qr(state: &Shared, username: &str) -> error::Result<Vec<u8>> {
    let Some(user) = state.users().get(username) else {
        return Err(Error::api((UserKind::NotFound, "user not found")));
    };

    let Some(totp) = &user.totp else {
        return Err(Error::api((AuthKind::TotpNotEnabled, "totp is not enabled for this user")));
    };

    let uri = totp.provisioning_uri(state.issuer(), &user.username)
        .map_err(|_| Error::new().message("failed building provisioning uri"))?;

    Ok(qr::provisioning_png(uri)?)
}
