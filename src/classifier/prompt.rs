/// Build the extraction prompt for a WhatsApp message.
pub fn build_prompt(message: &str) -> String {
    format!(
        r#"Eres un asistente que convierte mensajes inmobiliarios de WhatsApp en registros para una planilla.
Un mismo mensaje puede traer varios avisos: extrae cada aviso por separado.

Responde solamente con un objeto JSON con esta forma:
{{
  "is_multiple": true | false,
  "anuncios": [
    {{
      "busco_ofrezco": "Ofrezco" | "Busco",
      "tipo_operacion": "Venta" | "Arriendo" | "Compra" | "Permuta" | null,
      "propiedad": "Casa" | "Departamento" | "Oficina" | "Local Comercial" | "Terreno" | "Parcela" | "Bodega" | null,
      "region": string | null,
      "ciudad": string | null,
      "opcion_comuna": string | null,
      "opcion_comuna_2": string | null,
      "opcion_comuna_3": string | null,
      "opcion_comuna_4": string | null,
      "dormitorios": string | null,
      "banos": string | null,
      "estacionamiento": string | null,
      "bodegas": string | null,
      "valor": string | null,
      "moneda": "CLP" | "UF" | null,
      "gastos_comunes": string | null,
      "metros_cuadrados": string | null,
      "telefono": string | null,
      "correo_electronico": string | null,
      "texto_original_fragmento_anuncio": string
    }}
  ]
}}

Reglas:
- Si un dato no aparece usa null. Nunca escribas "N/D", "No especificado", "0" ni cadenas vacías.
- Un aviso que describe una propiedad con características o precio y no dice "busco", "necesito" o "requiero" es "Ofrezco".
- Dormitorios, baños, estacionamientos y bodegas van como dígitos ("dos" -> "2"). Una mención sin cantidad ("con bodega") cuenta como "1".
- "valor" y "gastos_comunes" llevan solo dígitos, sin puntos, comas ni símbolos: "$550.000" -> "550000", "UF 3.000" -> "3000", "20 millones" -> "20000000".
- "moneda" es "UF" si se menciona UF y "CLP" si se habla de pesos o se usa "$".
- "metros_cuadrados" lleva solo el número ("100m2" -> "100").
- Si se ofrecen varias comunas como alternativas, usa opcion_comuna, opcion_comuna_2 y siguientes.
- Si el mensaje no contiene avisos, responde {{"is_multiple": false, "anuncios": []}}.

Mensaje:
"""
{}
""""#,
        message
    )
}
