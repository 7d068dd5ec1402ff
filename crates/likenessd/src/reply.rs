//! Reply intents emitted by the session controller.
//!
//! Every controller code path resolves to one of these (or to silence for
//! ignored events); the transport only ever sees rendered text.

use likeness_core::ConfidenceTier;

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Greeting,
    Help,
    BeginPrompt,
    FirstPhotoAccepted,
    NoFaceDetected,
    MultipleFacesDetected(usize),
    ExtractionFailed,
    ComparisonDone {
        similarity_percent: f32,
        tier: ConfidenceTier,
    },
    ComparisonFailed,
    Cancelled,
    InvalidFormat,
    IntakeFailed,
    StorageUnavailable,
    Busy,
    Expired,
}

impl Reply {
    /// Render the user-facing message text.
    pub fn text(&self) -> String {
        match self {
            Reply::Greeting => "Olá! Eu sou o Likeness, especialista em comparação de imagens \
                 faciais.\n\nPara iniciar uma comparação, envie o comando /reconhecimento.\n\n\
                 Para obter ajuda, envie /ajuda."
                .to_string(),
            Reply::Help => "Como usar o Likeness:\n\n\
                 1. Envie o comando /reconhecimento\n\
                 2. Envie a primeira foto com um rosto\n\
                 3. Envie a segunda foto com um rosto\n\
                 4. Aguarde o resultado da comparação\n\n\
                 O resultado mostrará a porcentagem de similaridade entre os rostos e o nível \
                 de confiabilidade da análise."
                .to_string(),
            Reply::BeginPrompt => "Vamos iniciar a comparação facial!\n\n\
                 Por favor, envie a primeira foto contendo um rosto."
                .to_string(),
            Reply::FirstPhotoAccepted => "Primeira foto recebida com sucesso!\n\n\
                 Agora, por favor, envie a segunda foto contendo um rosto para comparação."
                .to_string(),
            Reply::NoFaceDetected => "Não foi possível processar a imagem: nenhum rosto \
                 detectado.\n\nPor favor, envie outra foto onde o rosto esteja claramente \
                 visível."
                .to_string(),
            Reply::MultipleFacesDetected(count) => format!(
                "Detectei múltiplos rostos ({count}) na imagem. Para uma comparação mais \
                 precisa, envie uma foto contendo apenas um rosto.\n\n\
                 Por favor, envie outra imagem."
            ),
            Reply::ExtractionFailed => "Não foi possível extrair características faciais da \
                 imagem.\n\nPor favor, envie outra foto com melhor qualidade e iluminação."
                .to_string(),
            Reply::ComparisonDone {
                similarity_percent,
                tier,
            } => format!(
                "✅ Análise concluída!\n\n\
                 📊 Resultado da comparação facial:\n\n\
                 Similaridade: {similarity_percent:.2}%\n\
                 Confiabilidade: {}\n\n\
                 Para realizar uma nova comparação, envie o comando /reconhecimento novamente.",
                tier.label()
            ),
            Reply::ComparisonFailed => "❌ Ocorreu um erro durante a comparação das imagens.\n\n\
                 Isso pode acontecer devido a:\n\
                 - Baixa qualidade das imagens\n\
                 - Ângulos muito diferentes dos rostos\n\
                 - Iluminação inadequada\n\n\
                 Por favor, tente novamente com outras fotos usando o comando /reconhecimento."
                .to_string(),
            Reply::Cancelled => "Processo de comparação cancelado.\n\n\
                 Para iniciar uma nova comparação, envie o comando /reconhecimento."
                .to_string(),
            Reply::InvalidFormat => "Por favor, envie apenas arquivos de imagem (jpg, jpeg, \
                 png).\n\nPara continuar, envie uma foto válida."
                .to_string(),
            Reply::IntakeFailed => "Não foi possível receber a imagem.\n\n\
                 Por favor, envie a foto novamente."
                .to_string(),
            Reply::StorageUnavailable => "❌ O serviço está temporariamente indisponível para \
                 receber imagens e a comparação foi encerrada.\n\n\
                 Por favor, tente novamente mais tarde."
                .to_string(),
            Reply::Busy => "Ainda estou processando suas mensagens anteriores.\n\n\
                 Aguarde um instante e tente novamente."
                .to_string(),
            Reply::Expired => "A sessão de comparação expirou por inatividade.\n\n\
                 Para iniciar uma nova comparação, envie o comando /reconhecimento."
                .to_string(),
        }
    }
}
